//! Expense notification emails.
//!
//! When an expense changes, every other member of the group gets a notification email. This module renders the
//! messages and decides who receives them; the actual SMTP dialogue is behind the [`EmailTransport`] trait, with
//! [`LoggingTransport`] as the in-tree implementation (it logs the hand-off and drops the message, which is also
//! the behaviour when SMTP credentials are absent).

use log::*;
use se_common::Money;
use split_engine::{
    events::{ExpenseChange, ExpenseChangedEvent},
    GroupManagement,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Could not load notification recipients: {0}")]
    RecipientLookup(String),
    #[error("Email delivery failed: {0}")]
    DeliveryFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: String,
    pub subject: String,
    pub body: String,
}

/// The delivery seam. The notifier renders and addresses messages; a transport moves them.
#[allow(async_fn_in_trait)]
pub trait EmailTransport: Clone + Send + Sync {
    async fn deliver(&self, message: &EmailMessage) -> Result<(), MailerError>;
}

/// Logs the hand-off instead of speaking SMTP. Used when no SMTP credentials are configured, and in tests.
#[derive(Debug, Clone, Default)]
pub struct LoggingTransport;

impl EmailTransport for LoggingTransport {
    async fn deliver(&self, message: &EmailMessage) -> Result<(), MailerError> {
        info!("📧️ Email not sent - SMTP not configured. Subject: '{}', to: {}", message.subject, message.to);
        Ok(())
    }
}

pub struct EmailNotifier<B, T> {
    db: B,
    transport: T,
}

impl<B, T> EmailNotifier<B, T>
where
    B: GroupManagement,
    T: EmailTransport,
{
    pub fn new(db: B, transport: T) -> Self {
        Self { db, transport }
    }

    /// Sends one notification per group member other than the actor. Failures are logged per-recipient; one bounced
    /// address never blocks the rest.
    pub async fn notify_expense_changed(&self, event: ExpenseChangedEvent) {
        let group_name = match self.db.fetch_group(&event.group_id).await {
            Ok(Some(group)) => group.name,
            Ok(None) => event.group_id.to_string(),
            Err(e) => {
                warn!("📧️ Could not load group {} for notification: {e}", event.group_id);
                return;
            },
        };
        let members = match self.db.fetch_members(&event.group_id).await {
            Ok(members) => members,
            Err(e) => {
                warn!("📧️ Could not load members of {} for notification: {e}", event.group_id);
                return;
            },
        };
        let payer_name = members
            .iter()
            .find(|m| m.user_id == event.expense.paid_by_id)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| event.expense.paid_by_id.to_string());
        for member in members.iter().filter(|m| m.user_id != event.actor) {
            let message = render_expense_notification(
                event.change,
                &group_name,
                &payer_name,
                &event.expense.description,
                event.expense.amount,
                &member.name,
                &member.email,
            );
            if let Err(e) = self.transport.deliver(&message).await {
                warn!("📧️ Could not deliver notification to {}: {e}", member.email);
            }
        }
        trace!("📧️ Notifications for expense {} processed", event.expense.id);
    }
}

pub fn render_expense_notification(
    change: ExpenseChange,
    group_name: &str,
    payer_name: &str,
    description: &str,
    amount: Money,
    recipient_name: &str,
    recipient_email: &str,
) -> EmailMessage {
    let (verb, subject) = match change {
        ExpenseChange::Created => ("added to", format!("New expense added to {group_name}")),
        ExpenseChange::Updated => ("updated in", format!("An expense was updated in {group_name}")),
        ExpenseChange::Deleted => ("removed from", format!("An expense was removed from {group_name}")),
    };
    let body = format!(
        "Hi {recipient_name},\n\n\
         An expense has been {verb} your group \"{group_name}\".\n\n\
         Expense details:\n\
         - Description: {description}\n\
         - Amount: {amount}\n\
         - Paid by: {payer_name}\n\n\
         Check your SplitEase app to see how this affects your balances.\n\n\
         Best regards,\n\
         The SplitEase Team\n"
    );
    EmailMessage { to: recipient_email.to_string(), to_name: recipient_name.to_string(), subject, body }
}
