use adstream_consumer::{
    channel_source, run_partition_workers, total_batches, BatchProcessor, ConsumerError,
    PartitionSource, PartitionWorker, ProcessError, RawMessage, ThrottleProcessor, TrailingBatch,
    WorkerConfig, WorkerExit,
};
use adstream_metrics::ConsumerMetrics;
use adstream_record::{generate_record, ConsumedRecord};
use async_trait::async_trait;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Zero-delay processor remembering the ids of every batch it saw.
#[derive(Default)]
struct RecordingProcessor {
    batches: Mutex<Vec<(i32, Vec<u64>)>>,
}

impl RecordingProcessor {
    fn batches_for(&self, partition: i32) -> Vec<Vec<u64>> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| *p == partition)
            .map(|(_, ids)| ids.clone())
            .collect()
    }
}

#[async_trait]
impl BatchProcessor for RecordingProcessor {
    async fn process(
        &self,
        partition: i32,
        batch: &[ConsumedRecord],
        _cancel: &CancellationToken,
    ) -> Result<(), ProcessError> {
        let ids = batch.iter().map(|r| r.record_id).collect();
        self.batches.lock().unwrap().push((partition, ids));
        Ok(())
    }
}

fn message(partition: i32, offset: i64, record_id: u64) -> RawMessage {
    let payload = generate_record(record_id).encode().unwrap();
    RawMessage::new(partition, offset, payload)
}

async fn feed(sender: &mpsc::Sender<RawMessage>, partition: i32, ids: impl IntoIterator<Item = u64>) {
    for (offset, id) in ids.into_iter().enumerate() {
        sender.send(message(partition, offset as i64, id)).await.unwrap();
    }
}

fn metrics() -> Arc<ConsumerMetrics> {
    Arc::new(ConsumerMetrics::new().unwrap())
}

#[tokio::test]
async fn full_batches_are_flushed_in_order() {
    let (sender, source) = channel_source(0, 16);
    let processor = Arc::new(RecordingProcessor::default());
    let metrics = metrics();
    let worker = PartitionWorker::new(
        source,
        Arc::clone(&processor),
        Arc::clone(&metrics),
        WorkerConfig::new(3, TrailingBatch::Flush).unwrap(),
    );

    feed(&sender, 0, 0..6).await;
    drop(sender);
    let report = worker.run(CancellationToken::new()).await;

    assert_eq!(processor.batches_for(0), vec![vec![0, 1, 2], vec![3, 4, 5]]);
    assert_eq!(report.batches_flushed, 2);
    assert_eq!(report.records_consumed, 6);
    assert_eq!(report.trailing_dropped, 0);
    assert_eq!(report.exit, WorkerExit::SourceClosed);
    assert_eq!(metrics.batches_processed.get(), 2);
}

#[tokio::test]
async fn trailing_batch_is_flushed_on_close() {
    let (sender, source) = channel_source(0, 16);
    let processor = Arc::new(RecordingProcessor::default());
    let worker = PartitionWorker::new(
        source,
        Arc::clone(&processor),
        metrics(),
        WorkerConfig::new(3, TrailingBatch::Flush).unwrap(),
    );

    feed(&sender, 0, 0..2).await;
    drop(sender);
    let report = worker.run(CancellationToken::new()).await;

    assert_eq!(processor.batches_for(0), vec![vec![0, 1]]);
    assert_eq!(report.batches_flushed, 1);
    assert_eq!(report.trailing_dropped, 0);
}

#[tokio::test]
async fn trailing_batch_is_dropped_under_drop_policy() {
    let (sender, source) = channel_source(0, 16);
    let processor = Arc::new(RecordingProcessor::default());
    let metrics = metrics();
    let worker = PartitionWorker::new(
        source,
        Arc::clone(&processor),
        Arc::clone(&metrics),
        WorkerConfig::new(3, TrailingBatch::Drop).unwrap(),
    );

    feed(&sender, 0, 0..2).await;
    drop(sender);
    let report = worker.run(CancellationToken::new()).await;

    assert!(processor.batches_for(0).is_empty());
    assert_eq!(report.batches_flushed, 0);
    assert_eq!(report.trailing_dropped, 2);
    assert_eq!(metrics.batches_processed.get(), 0);
}

#[tokio::test]
async fn malformed_payload_is_skipped() {
    let (sender, source) = channel_source(0, 16);
    let processor = Arc::new(RecordingProcessor::default());
    let metrics = metrics();
    let worker = PartitionWorker::new(
        source,
        Arc::clone(&processor),
        Arc::clone(&metrics),
        WorkerConfig::new(2, TrailingBatch::Drop).unwrap(),
    );

    sender.send(message(0, 0, 10)).await.unwrap();
    sender
        .send(RawMessage::new(0, 1, b"{not json".to_vec()))
        .await
        .unwrap();
    sender.send(message(0, 2, 11)).await.unwrap();
    drop(sender);
    let report = worker.run(CancellationToken::new()).await;

    assert_eq!(processor.batches_for(0), vec![vec![10, 11]]);
    assert_eq!(report.malformed_records, 1);
    assert_eq!(report.records_consumed, 2);
    assert_eq!(metrics.malformed_records.get(), 1);
}

#[tokio::test]
async fn flush_count_is_floor_of_consumed_over_capacity() {
    for (count, capacity) in [(0u64, 4usize), (3, 4), (4, 4), (17, 4), (100, 7)] {
        let (sender, source) = channel_source(0, 128);
        let processor = Arc::new(RecordingProcessor::default());
        let worker = PartitionWorker::new(
            source,
            Arc::clone(&processor),
            metrics(),
            WorkerConfig::new(capacity, TrailingBatch::Drop).unwrap(),
        );

        feed(&sender, 0, 0..count).await;
        drop(sender);
        let report = worker.run(CancellationToken::new()).await;

        assert_eq!(report.batches_flushed, count / capacity as u64);
        assert_eq!(report.trailing_dropped, count % capacity as u64);
        assert!(processor
            .batches_for(0)
            .iter()
            .all(|batch| batch.len() == capacity));
    }
}

#[tokio::test]
async fn partitions_are_batched_independently() {
    let processor = Arc::new(RecordingProcessor::default());
    let metrics = metrics();

    let mut sources = Vec::new();
    for partition in 0..3 {
        let (sender, source) = channel_source(partition, 64);
        let base = partition as u64 * 100;
        feed(&sender, partition, base..base + 5).await;
        sources.push(source);
    }

    let reports = run_partition_workers(
        sources,
        Arc::clone(&processor),
        Arc::clone(&metrics),
        WorkerConfig::new(2, TrailingBatch::Drop).unwrap(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(reports.len(), 3);
    for (partition, report) in reports.iter().enumerate() {
        let partition = partition as i32;
        let base = partition as u64 * 100;
        assert_eq!(report.partition, partition);
        assert_eq!(report.batches_flushed, 2);
        assert_eq!(report.trailing_dropped, 1);
        assert_eq!(
            processor.batches_for(partition),
            vec![vec![base, base + 1], vec![base + 2, base + 3]]
        );
    }
    assert_eq!(total_batches(&reports), 6);
    assert_eq!(metrics.batches_processed.get(), 6);
    assert_eq!(metrics.records_consumed.with_label_values(&["1"]).get(), 5);
}

#[tokio::test]
async fn empty_source_list_is_rejected() {
    let sources: Vec<adstream_consumer::ChannelSource> = Vec::new();
    let result = run_partition_workers(
        sources,
        Arc::new(RecordingProcessor::default()),
        metrics(),
        WorkerConfig::new(2, TrailingBatch::Flush).unwrap(),
        CancellationToken::new(),
    )
    .await;

    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn throttled_batches_are_measured() {
    let delay = Duration::from_secs(2);
    let (sender, source) = channel_source(0, 16);
    let metrics = metrics();
    let worker = PartitionWorker::new(
        source,
        Arc::new(ThrottleProcessor::new(delay)),
        Arc::clone(&metrics),
        WorkerConfig::new(2, TrailingBatch::Drop).unwrap(),
    );

    feed(&sender, 0, 0..6).await;
    drop(sender);
    let report = worker.run(CancellationToken::new()).await;

    assert_eq!(report.batches_flushed, 3);
    assert_eq!(metrics.batches_processed.get(), 3);
    assert_eq!(metrics.batch_duration.get_sample_count(), 3);
    assert!(metrics.batch_duration.get_sample_sum() >= 3.0 * delay.as_secs_f64());

    // No observation falls into a bucket below the delay.
    let families = metrics.registry().gather();
    let histogram = families
        .iter()
        .find(|f| f.get_name() == "consumer_batch_duration_seconds")
        .unwrap()
        .get_metric()[0]
        .get_histogram();
    for bucket in histogram.get_bucket() {
        if bucket.get_upper_bound() < delay.as_secs_f64() {
            assert_eq!(bucket.get_cumulative_count(), 0);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_throttle_and_receive() {
    let (sender, source) = channel_source(0, 16);
    let metrics = metrics();
    let cancel = CancellationToken::new();
    let worker = PartitionWorker::new(
        source,
        Arc::new(ThrottleProcessor::new(Duration::from_secs(30))),
        Arc::clone(&metrics),
        WorkerConfig::new(2, TrailingBatch::Flush).unwrap(),
    );

    feed(&sender, 0, 0..3).await;
    let handle = tokio::spawn(worker.run(cancel.clone()));

    tokio::time::sleep(Duration::from_secs(1)).await;
    cancel.cancel();
    let report = handle.await.unwrap();

    // The sender is still alive, so only cancellation could have stopped the worker.
    assert_eq!(report.exit, WorkerExit::Cancelled);
    assert_eq!(report.batches_flushed, 0);
    assert_eq!(report.trailing_dropped, 2);
    assert_eq!(metrics.batches_processed.get(), 0);
    drop(sender);
}

#[tokio::test]
async fn idle_worker_stops_on_cancel() {
    let (_sender, source) = channel_source(0, 1);
    let cancel = CancellationToken::new();
    let worker = PartitionWorker::new(
        source,
        Arc::new(RecordingProcessor::default()),
        metrics(),
        WorkerConfig::new(2, TrailingBatch::Flush).unwrap(),
    );

    cancel.cancel();
    let report = worker.run(cancel).await;

    assert_eq!(report.exit, WorkerExit::Cancelled);
    assert_eq!(report.records_consumed, 0);
}

/// Source replaying a fixed script of messages and transport errors, then closing.
struct ScriptedSource {
    partition: i32,
    script: VecDeque<Result<RawMessage, ConsumerError>>,
}

#[async_trait]
impl PartitionSource for ScriptedSource {
    fn partition(&self) -> i32 {
        self.partition
    }

    async fn recv(&mut self) -> Option<Result<RawMessage, ConsumerError>> {
        self.script.pop_front()
    }
}

fn transport_error() -> ConsumerError {
    ConsumerError::Kafka(KafkaError::MessageConsumption(
        RDKafkaErrorCode::BrokerTransportFailure,
    ))
}

#[tokio::test]
async fn receive_errors_are_counted_and_skipped() {
    let source = ScriptedSource {
        partition: 1,
        script: VecDeque::from(vec![
            Ok(message(1, 0, 20)),
            Err(transport_error()),
            Ok(message(1, 1, 21)),
            Err(transport_error()),
            Ok(message(1, 2, 22)),
            Ok(message(1, 3, 23)),
        ]),
    };
    let processor = Arc::new(RecordingProcessor::default());
    let metrics = metrics();
    let worker = PartitionWorker::new(
        source,
        Arc::clone(&processor),
        Arc::clone(&metrics),
        WorkerConfig::new(2, TrailingBatch::Flush).unwrap(),
    );

    let report = worker.run(CancellationToken::new()).await;

    assert_eq!(report.receive_errors, 2);
    assert_eq!(report.records_consumed, 4);
    assert_eq!(report.exit, WorkerExit::SourceClosed);
    assert_eq!(metrics.receive_errors.get(), 2);
    assert_eq!(processor.batches_for(1), vec![vec![20, 21], vec![22, 23]]);
}

/// Fails the first batch it sees and records every later one.
#[derive(Default)]
struct FailFirstProcessor {
    failed: AtomicBool,
    inner: RecordingProcessor,
}

#[async_trait]
impl BatchProcessor for FailFirstProcessor {
    async fn process(
        &self,
        partition: i32,
        batch: &[ConsumedRecord],
        cancel: &CancellationToken,
    ) -> Result<(), ProcessError> {
        if !self.failed.swap(true, Ordering::SeqCst) {
            return Err(ProcessError::Failed("downstream unavailable".to_string()));
        }
        self.inner.process(partition, batch, cancel).await
    }
}

#[tokio::test]
async fn failed_batch_is_discarded_and_worker_continues() {
    let (sender, source) = channel_source(0, 16);
    let processor = Arc::new(FailFirstProcessor::default());
    let metrics = metrics();
    let worker = PartitionWorker::new(
        source,
        Arc::clone(&processor),
        Arc::clone(&metrics),
        WorkerConfig::new(2, TrailingBatch::Flush).unwrap(),
    );

    feed(&sender, 0, 0..5).await;
    drop(sender);
    let report = worker.run(CancellationToken::new()).await;

    assert_eq!(report.batch_failures, 1);
    assert_eq!(report.batches_flushed, 2);
    assert_eq!(report.trailing_dropped, 0);
    assert_eq!(metrics.batch_failures.get(), 1);
    assert_eq!(metrics.batches_processed.get(), 2);
    assert_eq!(processor.inner.batches_for(0), vec![vec![2, 3], vec![4]]);
}
