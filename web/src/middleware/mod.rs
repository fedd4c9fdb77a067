pub(crate) mod access_gate;
