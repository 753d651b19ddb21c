use libafl_bolts::{
    rands::Rand,
    Named,
};
use libafl::{
    corpus::{Corpus, CorpusId},
    inputs::{HasMutatorBytes, Input, ResizableMutator},
    mutators::{MutationResult, Mutator},
    state::{HasCorpus, HasRand},
    Error,
};
use std::borrow::Cow;
use std::num::NonZeroUsize;

use crate::{
    components::mutator::DEFAULT_MAX_SIZE,
    error::HookError,
    hooks::{ffi, Hooks},
};

/// Recombine `data1` and `data2` into `out` with the custom crossover of `hooks`.
///
/// `out` ends up with exactly the bytes the harness wrote.
pub(crate) fn crossover_bytes(
    hooks: &Hooks,
    data1: &[u8],
    data2: &[u8],
    out: &mut Vec<u8>,
    max_size: usize,
    seed: u32,
) -> Result<usize, HookError> {
    out.clear();
    out.resize(max_size, 0);

    let written = hooks.libfuzzer_custom_crossover(data1, data2, out, seed)?.min(max_size);
    out.truncate(written);
    Ok(written)
}

/// This component combines the current input with a random corpus entry through
/// `LLVMFuzzerCustomCrossOver()` of the harness.
pub struct LibfuzzerCustomCrossover<'a> {
    hooks: &'a Hooks,
    max_size: usize,
    buffer: Vec<u8>,
}

impl<'a> LibfuzzerCustomCrossover<'a> {
    /// Create a new crossover mutator. Fails if the harness has no custom crossover.
    pub fn new(hooks: &'a Hooks) -> Result<Self, HookError> {
        if !hooks.has_libfuzzer_custom_crossover() {
            return Err(HookError::Missing(ffi::CUSTOM_CROSSOVER));
        }

        Ok(Self {
            hooks,
            max_size: DEFAULT_MAX_SIZE,
            buffer: Vec::with_capacity(DEFAULT_MAX_SIZE),
        })
    }

    /// Set the `MaxOutSize` that is passed to the harness.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }
}

impl Named for LibfuzzerCustomCrossover<'_> {
    fn name(&self) -> &Cow<'static, str> {
        static NAME: Cow<'static, str> = Cow::Borrowed("LibfuzzerCustomCrossover");
        &NAME
    }
}

impl<I, S> Mutator<I, S> for LibfuzzerCustomCrossover<'_>
where
    S: HasRand + HasCorpus<I>,
    I: Input + HasMutatorBytes + ResizableMutator<u8>,
{
    fn mutate(&mut self, state: &mut S, input: &mut I) -> Result<MutationResult, Error> {
        let Some(count) = NonZeroUsize::new(state.corpus().count()) else {
            return Ok(MutationResult::Skipped);
        };

        let nth = state.rand_mut().below(count);
        let id = state.corpus().nth(nth);

        if *state.corpus().current() == Some(id) {
            return Ok(MutationResult::Skipped);
        }

        let other = {
            let mut testcase = state.corpus().get(id)?.borrow_mut();
            testcase.load_input(state.corpus())?.mutator_bytes().to_vec()
        };

        let seed = state.rand_mut().next() as u32;
        let written = crossover_bytes(self.hooks, input.mutator_bytes(), &other, &mut self.buffer, self.max_size, seed)?;

        if written == 0 {
            return Ok(MutationResult::Skipped);
        }

        input.resize(written, 0);
        input.mutator_bytes_mut().copy_from_slice(&self.buffer);
        Ok(MutationResult::Mutated)
    }

    fn post_exec(&mut self, _state: &mut S, _new_corpus_id: Option<CorpusId>) -> Result<(), Error> {
        Ok(())
    }
}
