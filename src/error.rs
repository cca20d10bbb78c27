use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("failed to open channel for {resource}: {reason}")]
    ChannelOpen { resource: String, reason: String },

    #[error("read failed on channel {resource}: {reason}")]
    ChannelRead { resource: String, reason: String },

    #[error("fetch task for {resource} failed: {reason}")]
    Task { resource: String, reason: String },
}

impl FeedError {
    pub fn open(resource: impl Into<String>, reason: impl ToString) -> Self {
        Self::ChannelOpen {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    pub fn read(resource: impl Into<String>, reason: impl ToString) -> Self {
        Self::ChannelRead {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }
}
