// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

/// Failure of a single fetch. Cloneable so one settled request can be handed
/// to every caller that waited on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{status} {message}")]
    Status { status: u16, message: String },

    #[error("decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("unexpected response from {url}: expected {expected}")]
    Unexpected { url: String, expected: &'static str },

    #[error("invalid request header {name:?}")]
    InvalidHeader { name: String },
}

impl FetchError {
    pub(crate) fn transport(url: &str, error: &reqwest::Error) -> Self {
        Self::Transport {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
