//! # CardWise
//!
//! A retrieval-augmented assistant for Hong Kong credit card terms.
//!
//! Questions go through a four-step pipeline: the query is optionally
//! rewritten for semantic search, embedded, matched against a managed vector
//! index, and answered by a chat model grounded in the retrieved passages and
//! the conversation so far.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────┐   ┌───────┐   ┌──────────┐   ┌────────────┐
//! │  Refine  │──▶│ Embed  │──▶│Search │──▶│ Project  │──▶│ Synthesize │
//! │ (chat)   │   │(cached)│   │(index)│   │(results) │   │   (chat)   │
//! └──────────┘   └────────┘   └───────┘   └──────────┘   └─────┬──────┘
//!                                                              ▼
//!                                                  Session / Conversation
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Messages, vector matches, search results |
//! | [`openai`] | OpenAI / Azure OpenAI endpoint plumbing |
//! | [`embedding`] | Embedding client and session cache |
//! | [`generation`] | Chat completion client |
//! | [`vector`] | Vector search client |
//! | [`results`] | Match-to-result projection |
//! | [`refine`] | Query refinement |
//! | [`synthesize`] | Grounded answer synthesis |
//! | [`pipeline`] | Orchestration of the four steps |
//! | [`progress`] | Stage reporting |
//! | [`session`] | Conversation state |
//! | [`catalog`] | Static card catalog and terms |

pub mod ask;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod embedding;
pub mod generation;
pub mod models;
pub mod openai;
pub mod pipeline;
pub mod progress;
pub mod refine;
pub mod results;
pub mod session;
pub mod synthesize;
pub mod vector;
