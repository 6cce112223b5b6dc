use tracing::debug;

use crate::{
    domain::RepliedMessage, errors::Error, messaging::port::MessagingPort, Result,
};

/// Where resolved content came from; drives how the result is rendered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentSource {
    Text,
    Document { file_name: Option<String> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedContent {
    pub text: String,
    pub source: ContentSource,
}

/// Extract the text to operate on from the replied-to message.
///
/// Inline text wins; otherwise an attached file is downloaded (up to
/// `max_file_size` bytes) and decoded as UTF-8. Anything else is
/// `Error::NoContent`.
pub async fn resolve(
    replied: &RepliedMessage,
    files: &dyn MessagingPort,
    max_file_size: u64,
) -> Result<ResolvedContent> {
    if let Some(text) = replied.text.as_deref().filter(|t| !t.is_empty()) {
        return Ok(ResolvedContent {
            text: text.to_string(),
            source: ContentSource::Text,
        });
    }

    let Some(file) = &replied.file else {
        return Err(Error::NoContent);
    };
    if file.size > max_file_size {
        return Err(Error::FileTooLarge {
            size: file.size,
            limit: max_file_size,
        });
    }

    let bytes = files.fetch_file(file).await?;
    debug!(file_id = %file.file_id, bytes = bytes.len(), "fetched replied-to file");
    if bytes.len() as u64 > max_file_size {
        return Err(Error::FileTooLarge {
            size: bytes.len() as u64,
            limit: max_file_size,
        });
    }

    let text = String::from_utf8(bytes).map_err(|_| Error::NotText)?;
    if text.trim().is_empty() {
        return Err(Error::NoContent);
    }

    Ok(ResolvedContent {
        text,
        source: ContentSource::Document {
            file_name: file.file_name.clone(),
        },
    })
}
