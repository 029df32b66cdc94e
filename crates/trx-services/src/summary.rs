//! Log summarization collaborator. Invoked on demand; never touches
//! protocol state.

use std::collections::BTreeMap;

use futures::future::{self, BoxFuture};
use futures::FutureExt;

use trx_core::message::Message;

use crate::message_store::{format_line, format_time};

pub const EMPTY_LOG: &str = "No transcripts to summarize.";

pub trait Summarizer: Send + Sync {
    fn summarize<'a>(&'a self, messages: &'a [Message]) -> BoxFuture<'a, String>;
}

/// Local summary: time span, per-speaker counts, and the last line.
pub struct DigestSummarizer;

impl DigestSummarizer {
    fn digest(messages: &[Message]) -> String {
        let (Some(first), Some(last)) = (messages.first(), messages.last()) else {
            return EMPTY_LOG.to_string();
        };

        let mut per_speaker: BTreeMap<&str, usize> = BTreeMap::new();
        for m in messages {
            *per_speaker.entry(m.user_name.as_str()).or_default() += 1;
        }

        let mut out = format!(
            "{} messages from {} speakers, {} to {}.\n",
            messages.len(),
            per_speaker.len(),
            format_time(first.timestamp),
            format_time(last.timestamp),
        );
        for (speaker, count) in &per_speaker {
            out.push_str(&format!("- {speaker}: {count}\n"));
        }
        out.push_str(&format!("Last: {}", format_line(last)));
        out
    }
}

impl Summarizer for DigestSummarizer {
    fn summarize<'a>(&'a self, messages: &'a [Message]) -> BoxFuture<'a, String> {
        future::ready(Self::digest(messages)).boxed()
    }
}
