// handlers/mod.rs - Handlers grouped by the gate tier they sit behind
//
// Public handlers are reachable without a token. Protected handlers only run
// after the gate validated the caller and attached the fresh `Identity` as a
// request extension.
pub mod protected;
pub mod public;
