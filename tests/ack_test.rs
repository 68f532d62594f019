//! Acknowledgement behavior: coalescing, failure fan-out and caller
//! misuse.

mod common;

use common::{driver_msg_with_token, ScriptedSubscriptionDriver};
use futures::future::join_all;
use mqport::{Error, Message, Subscription, SubscriptionOptions};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn five_acks_coalesce_into_one_driver_call() {
    let driver = Arc::new(ScriptedSubscriptionDriver::new(vec![Ok(vec![
        driver_msg_with_token("a"),
        driver_msg_with_token("b"),
        driver_msg_with_token("c"),
        driver_msg_with_token("d"),
        driver_msg_with_token("e"),
    ])]));
    let subscription = Subscription::new(
        Arc::clone(&driver),
        SubscriptionOptions {
            ack_delay: Duration::from_secs(10),
            ack_batch_size: 5,
        },
    );

    let mut messages = Vec::new();
    for _ in 0..5 {
        messages.push(subscription.receive().await.unwrap());
    }

    let results = join_all(messages.into_iter().map(Message::ack)).await;
    for result in results {
        result.unwrap();
    }

    let batches = driver.ack_batches.lock().clone();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 5);

    subscription.close().await.unwrap();
}

#[tokio::test]
async fn ack_batch_failure_fans_out_to_every_member() {
    let error = Error::driver("acks rejected");
    let driver = Arc::new(ScriptedSubscriptionDriver::new(vec![Ok(vec![
        driver_msg_with_token("a"),
        driver_msg_with_token("b"),
    ])]));
    *driver.fail_acks_with.lock() = Some(error.clone());
    let subscription = Subscription::new(
        Arc::clone(&driver),
        SubscriptionOptions {
            ack_delay: Duration::from_millis(5),
            ack_batch_size: 2,
        },
    );

    let first = subscription.receive().await.unwrap();
    let second = subscription.receive().await.unwrap();

    let results = join_all([first.ack(), second.ack()]).await;
    assert_eq!(driver.ack_batch_count(), 1);
    for result in results {
        assert_eq!(result, Err(error.clone()));
    }

    subscription.close().await.unwrap();
}

#[tokio::test]
async fn acking_an_unreceived_message_is_caller_misuse() {
    let result = Message::new(b"never received".to_vec()).ack().await;
    assert!(matches!(result, Err(Error::CallerMisuse { .. })));
}

#[tokio::test]
async fn ack_after_close_is_a_closed_error() {
    let driver = Arc::new(ScriptedSubscriptionDriver::new(vec![Ok(vec![
        driver_msg_with_token("late"),
    ])]));
    let subscription = Subscription::new(Arc::clone(&driver), SubscriptionOptions::default());

    let message = subscription.receive().await.unwrap();
    subscription.close().await.unwrap();

    assert_eq!(message.ack().await, Err(Error::Closed));
    assert_eq!(driver.ack_batch_count(), 0);
}

#[tokio::test]
async fn ack_after_subscription_dropped_is_caller_misuse() {
    let driver = Arc::new(ScriptedSubscriptionDriver::new(vec![Ok(vec![
        driver_msg_with_token("orphan"),
    ])]));
    let subscription = Subscription::new(Arc::clone(&driver), SubscriptionOptions::default());

    let message = subscription.receive().await.unwrap();
    assert!(message.can_ack());
    drop(subscription);

    assert!(matches!(
        message.ack().await,
        Err(Error::CallerMisuse { .. })
    ));
}
