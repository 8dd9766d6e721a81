// Retry-tagged items carry an opaque counter through the queue.

use anyhow::Result;
use rust_fifoqueue::{FifoQueue, QueueConfig, RetryItem, Value};
use serde_json::json;
use tempfile::TempDir;

fn create_temp_queue(default_max_try: i64) -> Result<(FifoQueue, TempDir)> {
    let dir = tempfile::tempdir()?;
    let config = QueueConfig::new(dir.path().join("retry")).with_default_max_try(default_max_try);
    Ok((FifoQueue::open(config)?, dir))
}

#[test]
fn test_retry_item_plain_pop_drops_counter() -> Result<()> {
    let (mut queue, _dir) = create_temp_queue(3)?;
    queue.push(RetryItem::new(1, 1))?;
    assert_eq!(queue.pop()?, Value::Int(1));
    queue.push(RetryItem::new(2.2, 2))?;
    assert_eq!(queue.pop()?, Value::Float(2.2));
    queue.push(RetryItem::new("3", 3))?;
    assert_eq!(queue.pop()?, Value::from("3"));

    let list = Value::try_from(json!([1, 2.2, "3", {"4": 4}]))?;
    queue.push(RetryItem::new(list.clone(), 4))?;
    assert_eq!(queue.pop()?, list);

    let dict = Value::try_from(json!({"a": 1, "b": 2.2, "c": "3.3", "d": [4], "e": {"f": "f"}}))?;
    queue.push(RetryItem::new(dict.clone(), 5))?;
    assert_eq!(queue.pop()?, dict);
    Ok(())
}

#[test]
fn test_retry_pop_returns_counter() -> Result<()> {
    let (mut queue, _dir) = create_temp_queue(3)?;
    queue.push(RetryItem::new("job", 2))?;
    assert_eq!(queue.peek_retry()?, (Value::from("job"), 2));
    assert_eq!(queue.len()?, 1);
    assert_eq!(queue.pop_retry()?, (Value::from("job"), 2));
    assert_eq!(queue.len()?, 0);
    Ok(())
}

#[test]
fn test_mixed_queue_in_retry_mode() -> Result<()> {
    let (mut queue, _dir) = create_temp_queue(5)?;
    queue.push(10)?;
    queue.push(RetryItem::new(11, 0))?;
    queue.push("twelve")?;
    let popped = queue.pops_retry(10)?;
    assert_eq!(
        popped,
        vec![
            (Value::Int(10), 5),
            (Value::Int(11), 0),
            (Value::from("twelve"), 5),
        ]
    );
    Ok(())
}

#[test]
fn test_caller_driven_redelivery() -> Result<()> {
    let (mut queue, _dir) = create_temp_queue(2)?;
    queue.push("flaky")?;

    let mut attempts = 0;
    loop {
        let (job, again) = match queue.pop_retry() {
            Ok(next) => next,
            Err(e) if e.is_empty_queue() => break,
            Err(e) => return Err(e.into()),
        };
        attempts += 1;
        // Every attempt fails; re-queue until the counter runs out.
        if again > 0 {
            queue.push(RetryItem::new(job, again - 1))?;
        }
    }
    assert_eq!(attempts, 3);
    assert_eq!(queue.len()?, 0);
    Ok(())
}

#[test]
fn test_retry_counter_survives_reopen() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("retry");
    let mut queue = FifoQueue::open(QueueConfig::new(&path))?;
    queue.push(RetryItem::new(vec![1, 2], 9))?;
    queue.close()?;

    let mut queue = FifoQueue::open(QueueConfig::new(&path))?;
    assert_eq!(queue.pop_retry()?, (Value::from(vec![1, 2]), 9));
    Ok(())
}
