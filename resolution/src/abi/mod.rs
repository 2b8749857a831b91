//! # Contract ABI Codec
//!
//! Turns `(method, arguments)` into `eth_call` payloads and reply bytes back
//! into typed values, driven by a [`ContractDescriptor`] parsed from
//! human-readable Solidity fragments.
//!
//! ```text
//! types.rs       ParamType / Token value model
//! descriptor.rs  fragment parser, selectors, event topics
//! encode.rs      head/tail encoder
//! decode.rs      bounds-checked decoder
//! ```
//!
//! Only the types the registries' read interfaces use are supported. There
//! are no tuples, no signed integers and no fixed-size arrays, and the parser
//! rejects them rather than guessing.

pub mod decode;
pub mod descriptor;
pub mod encode;
pub mod types;

pub use decode::decode;
pub use descriptor::{ContractDescriptor, Event, Function, Param};
pub use encode::encode;
pub use types::{ParamType, Token, Word};
