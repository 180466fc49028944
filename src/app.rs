//! The main application logic, decoupled from the entry point.

use crate::{
    config::{Config, Variant},
    core::NotificationHandler,
    delivery::DeliveryReport,
    formatting::formatter_for,
    notification::{ConsoleHandler, Publisher, Subscriber},
    observer::{EmailNotifier, Observer, OrderService, SmsNotifier, Subject},
    task_manager::TaskManager,
};
use anyhow::{bail, Result};
use std::{sync::Arc, time::Duration};
use tracing::{info, instrument, warn};

pub const EMAIL_SUBSCRIBER: &str = "📧 EmailNotifier";
pub const SMS_SUBSCRIBER: &str = "📱 SMSNotifier";

/// Runs the configured scenario against the console.
pub async fn run(config: &Config) -> Result<()> {
    match config.variant {
        Variant::Channels => {
            let handler = Arc::new(ConsoleHandler::new(formatter_for(&config.output.format)));
            run_channel_scenario(config, handler).await?;
        }
        Variant::Callbacks => {
            run_callback_scenario(
                config,
                Arc::new(EmailNotifier::new("user@example.com")),
                Arc::new(SmsNotifier::new("+1234567890")),
            );
        }
    }
    Ok(())
}

/// Publishes every configured status to an email and an SMS subscriber.
///
/// The SMS subscriber opts out before the last status: it is deregistered and
/// shut down, so only the email subscriber sees the final update. All
/// subscribers are shut down and awaited before returning.
///
/// Returns the delivery report of every update, in order.
#[instrument(skip_all, fields(order_id = %config.order_id))]
pub async fn run_channel_scenario(
    config: &Config,
    handler: Arc<dyn NotificationHandler>,
) -> Result<Vec<DeliveryReport>> {
    let mode = config.delivery.delivery_mode()?;
    let tasks = TaskManager::new();
    let pause = Duration::from_millis(config.pause_ms);

    let email = Subscriber::spawn(EMAIL_SUBSCRIBER, mode, handler.clone(), &tasks).await;
    let sms = Subscriber::spawn(SMS_SUBSCRIBER, mode, handler, &tasks).await;

    let mut publisher = Publisher::new(config.order_id.as_str());
    publisher.register(email);
    publisher.register(sms.clone());
    info!("Registered {} subscribers.", publisher.subscriber_count());

    let mut reports = Vec::with_capacity(config.statuses.len());
    let total = config.statuses.len();
    for (i, status) in config.statuses.iter().enumerate() {
        if sms_opts_out_before(i, total) {
            publisher.deregister(&sms);
            sms.shutdown();
            info!("{} opted out.", sms.name());
        }
        let report = publisher.update_status(status.as_str()).await;
        if !report.is_complete() {
            warn!(
                "Status '{}' reached {} of {} subscribers.",
                status,
                report.delivered(),
                report.outcomes.len()
            );
        }
        reports.push(report);
        if i + 1 < total {
            tokio::time::sleep(pause).await;
        }
    }

    publisher.shutdown_all();
    let panicked = tasks.join().await;
    if !panicked.is_empty() {
        bail!("subscriber tasks panicked: {}", panicked.join(", "));
    }
    Ok(reports)
}

/// The callback counterpart of [`run_channel_scenario`].
pub fn run_callback_scenario(config: &Config, email: Arc<dyn Observer>, sms: Arc<dyn Observer>) {
    let mut service = OrderService::new(config.order_id.as_str());
    service.register(email);
    service.register(sms.clone());

    for (i, status) in config.statuses.iter().enumerate() {
        if sms_opts_out_before(i, config.statuses.len()) {
            service.deregister(&sms);
            info!("SMS observer opted out.");
        }
        service.update_status(status.as_str());
    }
}

/// The SMS subscriber leaves before the last of several statuses.
fn sms_opts_out_before(index: usize, total: usize) -> bool {
    index > 0 && index + 1 == total
}
