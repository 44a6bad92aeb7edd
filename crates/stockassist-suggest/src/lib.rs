//! Symbol suggestions for the StockAssist client.
//!
//! This crate provides:
//! - `PriorityTable`: curated primary listings per root symbol
//! - `rank`: re-ordering of raw search results around those listings
//! - `SuggestClient`: the `/api/stock/suggest` HTTP client
//! - `SuggestionService`: debounced, sequence-guarded lookup
//! - Helpers for the comma-separated symbol input

pub mod client;
pub mod error;
pub mod input;
pub mod priority;
pub mod ranking;
pub mod service;

pub use client::{SuggestClient, SuggestSource};
pub use error::{RankingInputError, SuggestError, SuggestResult};
pub use input::{active_term, append_symbol, plain_symbol, selected_symbols};
pub use priority::{PriorityEntry, PriorityTable};
pub use ranking::{base_symbol, rank, RankedSuggestion, Ranker};
pub use service::{SuggestConfig, SuggestionService, SuggestionUpdate};
