//! 单条消息发送（管理端与边缘函数共用）

use tracing::info;

use super::email::OutgoingEmail;
use crate::errors::{PortalError, Result};
use crate::models::messaging::requests::{SendEmailRequest, SendWhatsAppRequest};
use crate::models::messaging::responses::{EmailSendResponse, WhatsAppSendResponse};
use crate::services::integrations::Integrations;
use crate::utils::normalize_phone;
use crate::utils::validate::{validate_email, validate_required_text};

pub async fn send_whatsapp(
    integrations: &Integrations,
    request: SendWhatsAppRequest,
) -> Result<WhatsAppSendResponse> {
    let phone = normalize_phone(&request.phone)
        .ok_or_else(|| PortalError::validation(format!("Invalid phone number: {}", request.phone)))?;
    validate_required_text(&request.message, "message", 4096).map_err(PortalError::validation)?;

    let receipt = integrations
        .whatsapp()?
        .send_text(&phone, &request.message)
        .await?;
    info!("WhatsApp message sent to {}", phone);

    Ok(WhatsAppSendResponse {
        phone,
        message_id: receipt.message_id,
    })
}

pub async fn send_email(
    integrations: &Integrations,
    request: SendEmailRequest,
) -> Result<EmailSendResponse> {
    if request.to.is_empty() {
        return Err(PortalError::validation("At least one recipient is required"));
    }
    for address in &request.to {
        validate_email(address)
            .map_err(|e| PortalError::validation(format!("{address}: {e}")))?;
    }
    validate_required_text(&request.subject, "subject", 200).map_err(PortalError::validation)?;
    if request.html.trim().is_empty() {
        return Err(PortalError::validation("html is required"));
    }

    let id = integrations
        .email()
        .send(&OutgoingEmail {
            to: request.to,
            subject: request.subject,
            html: request.html,
        })
        .await?;
    info!("Email {} accepted by provider", id);

    Ok(EmailSendResponse { id })
}
