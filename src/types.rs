// src/types.rs
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::waveform::{PageReader, SessionSummary, StreamSettings};

// 播放目标 (raw PCM bytes are forwarded here)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackTarget {
    Null,
    Stdout,
    File(PathBuf),
}

impl FromStr for PlaybackTarget {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "" => Err("playback target must not be empty".to_owned()),
            "null" | "none" => Ok(Self::Null),
            "stdout" | "-" => Ok(Self::Stdout),
            path => Ok(Self::File(PathBuf::from(path))),
        }
    }
}

impl fmt::Display for PlaybackTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Stdout => f.write_str("stdout"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

// 后台发给 GUI 的消息
#[derive(Clone, Debug)]
pub enum StreamEvent {
    Log(String),
    Listening(SocketAddr),
    SessionStarted {
        peer: SocketAddr,
        reader: PageReader,
        settings: StreamSettings,
    },
    SessionEnded(SessionSummary),
}
