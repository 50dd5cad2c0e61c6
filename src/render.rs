pub(crate) mod pipeline;
pub(crate) mod reference;
pub(crate) mod synth;
