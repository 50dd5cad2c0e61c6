pub(crate) mod zoom;
