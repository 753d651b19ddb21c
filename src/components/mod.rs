//! This module contains LibAFL components that drive a libFuzzer harness through the [`Hooks`] registry.
//!
//! - [`LibfuzzerCustomMutator`] uses `LLVMFuzzerCustomMutator()` as a mutation
//! - [`LibfuzzerCustomCrossover`] uses `LLVMFuzzerCustomCrossOver()` with a random corpus entry
//! - [`libfuzzer_harness()`] turns `LLVMFuzzerTestOneInput()` into a harness for in-process executors
//!
//! The mutators check for their hook on construction, so a successfully created component never
//! calls into a hook that is absent.

mod crossover;
mod mutator;

use libafl::{
    executors::ExitKind,
    inputs::HasMutatorBytes,
};

use crate::hooks::Hooks;

pub use crossover::LibfuzzerCustomCrossover;
pub use mutator::{LibfuzzerCustomMutator, DEFAULT_MAX_SIZE};

/// Create a harness closure that feeds inputs to the single-input handler of `hooks`.
///
/// libFuzzer reserves non-zero return values of `LLVMFuzzerTestOneInput()` for future use,
/// they do not signal a crash. Crashes surface through the executor as usual.
pub fn libfuzzer_harness<I>(hooks: &Hooks) -> impl FnMut(&I) -> ExitKind + '_
where
    I: HasMutatorBytes,
{
    move |input: &I| {
        let status = hooks.run_one(input.mutator_bytes());
        if status != 0 {
            tracing::trace!(status, "LLVMFuzzerTestOneInput() returned a reserved value");
        }
        ExitKind::Ok
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use libafl::{
        corpus::InMemoryCorpus,
        feedbacks::ConstFeedback,
        inputs::BytesInput,
        state::{HasCorpus, HasRand, StdState},
    };
    use libafl_bolts::rands::StdRand;
    use crate::hooks::tests::crashing_input;

    /// A state with an empty in-memory corpus.
    pub(crate) fn test_state() -> impl HasRand + HasCorpus<BytesInput> {
        let mut feedback = ConstFeedback::new(false);
        let mut objective = ConstFeedback::new(false);

        StdState::new(
            StdRand::with_seed(1337),
            InMemoryCorpus::<BytesInput>::new(),
            InMemoryCorpus::new(),
            &mut feedback,
            &mut objective,
        )
        .unwrap()
    }

    #[test]
    fn test_harness() {
        let hooks = Hooks::builder().test_one_input(crashing_input).build();
        let mut harness = libfuzzer_harness::<BytesInput>(&hooks);

        assert_eq!(harness(&BytesInput::new(b"hello".to_vec())), ExitKind::Ok);
        assert_eq!(harness(&BytesInput::new(b"!".to_vec())), ExitKind::Ok);
    }
}
