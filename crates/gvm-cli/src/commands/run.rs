//! `gvm-cli run` - assemble a `.gvasm` file and execute it to completion
//! (or up to a tick budget), printing `print` opcode output to stdout.

use std::path::PathBuf;

use gvm_runtime::Runtime;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{CliError, Result};

#[derive(Debug, Clone)]
pub struct RunArgs {
    pub file: PathBuf,
    pub steps: Option<usize>,
}

pub fn run_run(args: RunArgs, config: Config) -> Result<()> {
    let source = std::fs::read_to_string(&args.file)?;
    let out = gvm_asm::assemble(&source).map_err(|e| CliError::Assemble(e.render(&source)))?;

    let mut runtime = Runtime::with_graph(out.graph);
    runtime.proc_init(out.head);

    let budget = args.steps.unwrap_or(config.max_ticks_per_run);
    let executed = run_to_budget(&mut runtime, budget, config.gc_every_n_ticks);

    info!(executed, remaining = runtime.process_count(), "run finished");
    Ok(())
}

/// Tick `runtime` up to `budget` times, collecting garbage every
/// `gc_every_n_ticks` ticks if set, and stopping early once every
/// process has exited. Returns the number of ticks actually executed.
fn run_to_budget(runtime: &mut Runtime, budget: usize, gc_every_n_ticks: Option<usize>) -> usize {
    let mut done = 0;
    while done < budget && runtime.process_count() > 0 {
        let chunk = gc_every_n_ticks.map(|n| n.max(1)).unwrap_or(budget - done).min(budget - done);
        let executed = runtime.step(chunk);
        done += executed;
        if gc_every_n_ticks.is_some() {
            debug!(done, "periodic gc");
            runtime.graph_mut().clean();
        }
        if executed == 0 {
            break;
        }
    }
    done
}
