//! The exchange protocol coordinators: per-thread state machines that
//! assemble protocol messages from format service contributions and route
//! inbound payloads back to the right service.

pub mod issuance;
pub mod presentation;
pub mod states;

use credflow_messages::{
    decorators::attachment::Attachment,
    msg_fields::{common::FormatSpec, ExchangeMessage},
};

use crate::{
    errors::{CredflowError, CredflowErrorKind, CredflowResult},
    formats::FormatAttachment,
};

/// Splits format service contributions into the parallel `formats[]` and
/// attachment arrays protocol messages carry.
pub(crate) fn split_parts(parts: Vec<FormatAttachment>) -> (Vec<FormatSpec>, Vec<Attachment>) {
    parts
        .into_iter()
        .map(|part| (part.spec, part.attachment))
        .unzip()
}

/// Fails when the message does not belong to the expected exchange thread.
pub fn verify_thread_id<M: ExchangeMessage>(message: &M, thread_id: &str) -> CredflowResult<()> {
    let matches = match message.thread() {
        Some(thread) => thread.matches(thread_id),
        None => message.id() == thread_id,
    };
    if matches {
        Ok(())
    } else {
        Err(CredflowError::from_msg(
            CredflowErrorKind::InvalidState,
            format!(
                "Message {} does not belong to exchange thread {thread_id}",
                message.id()
            ),
        ))
    }
}

/// Binds a format service to its payload within a message: first the one
/// format descriptor the service supports, then the attachment sharing its
/// id. Both lookups fail closed.
pub fn attachment_for_format(
    supports: impl Fn(&str) -> bool,
    formats: &[FormatSpec],
    attachments: &[Attachment],
) -> CredflowResult<Attachment> {
    let spec = formats
        .iter()
        .find(|spec| supports(&spec.format))
        .ok_or_else(|| {
            CredflowError::from_msg(
                CredflowErrorKind::NoMatchingFormatPlugin,
                "No format descriptor in the message matches the format service",
            )
        })?;

    attachments
        .iter()
        .find(|attachment| attachment.id.as_deref() == Some(spec.attach_id.as_str()))
        .cloned()
        .ok_or_else(|| {
            CredflowError::from_msg(
                CredflowErrorKind::AttachmentNotFound,
                format!("No attachment with id {}", spec.attach_id),
            )
        })
}
