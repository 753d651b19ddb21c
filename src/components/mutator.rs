use libafl_bolts::{
    rands::Rand,
    Named,
};
use libafl::{
    corpus::CorpusId,
    inputs::{HasMutatorBytes, ResizableMutator},
    mutators::{MutationResult, Mutator},
    state::HasRand,
    Error,
};
use std::borrow::Cow;

use crate::{
    error::HookError,
    hooks::{ffi, Hooks},
};

/// Default upper bound for inputs produced by the harness, the same as libFuzzer's `-max_len` default.
pub const DEFAULT_MAX_SIZE: usize = 4096;

/// Run the custom mutator of `hooks` on `bytes`.
///
/// `bytes` is grown to `max_size` for the duration of the call and truncated to the size
/// the harness reports afterwards. Inputs that are already larger than `max_size` are never
/// shrunk before the call.
pub(crate) fn mutate_bytes(hooks: &Hooks, bytes: &mut Vec<u8>, max_size: usize, seed: u32) -> Result<usize, HookError> {
    let size = bytes.len();
    let max_size = max_size.max(size);
    bytes.resize(max_size, 0);

    let new_size = hooks.libfuzzer_custom_mutator(bytes, size, seed)?.min(max_size);
    bytes.truncate(new_size);
    Ok(new_size)
}

/// This component hands mutations to `LLVMFuzzerCustomMutator()` of the harness.
pub struct LibfuzzerCustomMutator<'a> {
    hooks: &'a Hooks,
    max_size: usize,
    buffer: Vec<u8>,
}

impl<'a> LibfuzzerCustomMutator<'a> {
    /// Create a new mutator. Fails if the harness has no custom mutator.
    pub fn new(hooks: &'a Hooks) -> Result<Self, HookError> {
        if !hooks.has_libfuzzer_custom_mutator() {
            return Err(HookError::Missing(ffi::CUSTOM_MUTATOR));
        }

        Ok(Self {
            hooks,
            max_size: DEFAULT_MAX_SIZE,
            buffer: Vec::with_capacity(DEFAULT_MAX_SIZE),
        })
    }

    /// Set the `MaxSize` that is passed to the harness.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }
}

impl Named for LibfuzzerCustomMutator<'_> {
    fn name(&self) -> &Cow<'static, str> {
        static NAME: Cow<'static, str> = Cow::Borrowed("LibfuzzerCustomMutator");
        &NAME
    }
}

impl<I, S> Mutator<I, S> for LibfuzzerCustomMutator<'_>
where
    S: HasRand,
    I: HasMutatorBytes + ResizableMutator<u8>,
{
    fn mutate(&mut self, state: &mut S, input: &mut I) -> Result<MutationResult, Error> {
        let seed = state.rand_mut().next() as u32;

        self.buffer.clear();
        self.buffer.extend_from_slice(input.mutator_bytes());
        let old_size = self.buffer.len();

        let new_size = mutate_bytes(self.hooks, &mut self.buffer, self.max_size, seed)?;

        if new_size == old_size && self.buffer == input.mutator_bytes() {
            return Ok(MutationResult::Skipped);
        }

        input.resize(new_size, 0);
        input.mutator_bytes_mut().copy_from_slice(&self.buffer);
        Ok(MutationResult::Mutated)
    }

    fn post_exec(&mut self, _state: &mut S, _new_corpus_id: Option<CorpusId>) -> Result<(), Error> {
        Ok(())
    }
}
