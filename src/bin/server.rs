//! Synapse mediator server binary.
//! Run with: cargo run --bin synapse-server

use std::process::ExitCode;

use synapse_mediator::start_synapse;

fn main() -> ExitCode {
    start_synapse::run()
}
