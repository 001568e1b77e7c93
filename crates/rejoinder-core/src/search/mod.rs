//! Reply search over the decoder's per-step distributions.
//!
//! Only greedy decoding is provided: each step commits to the single most
//! probable token, so a reply is fully determined by its input.
//!
//! # Example
//!
//! ```
//! use candle_core::Device;
//! use rejoinder_core::model::Batch;
//! use rejoinder_core::search::GreedySearch;
//! use rejoinder_core::testing::{scripted_model, HELLO};
//! use rejoinder_core::vocab::EOS_TOKEN;
//!
//! let model = scripted_model(&Device::Cpu)?;
//! let batch = Batch::single(&[HELLO, EOS_TOKEN], &Device::Cpu)?;
//! let generation = GreedySearch::new(&model).generate(&batch, 10)?;
//! assert_eq!(generation.tokens, vec![HELLO, EOS_TOKEN]);
//! # Ok::<(), rejoinder_core::RejoinderError>(())
//! ```

mod greedy;

pub use greedy::{Generation, GreedySearch};
