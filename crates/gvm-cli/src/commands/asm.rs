//! `gvm-cli asm` - assemble a `.gvasm` file and report success or a
//! located failure, without running it.

use std::path::PathBuf;

use tracing::info;

use crate::error::{CliError, Result};

#[derive(Debug, Clone)]
pub struct AsmArgs {
    pub file: PathBuf,
    pub dump: bool,
}

pub fn run_asm(args: AsmArgs) -> Result<()> {
    let source = std::fs::read_to_string(&args.file)?;

    match gvm_asm::assemble(&source) {
        Ok(out) => {
            info!(nodes = out.graph.node_count(), "assembled successfully");
            println!("assembled successfully ({} node(s))", out.graph.node_count());
            if args.dump {
                if let Some(description) = out.graph.describe_node(out.head) {
                    print!("{description}");
                }
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", err.render(&source));
            Err(CliError::Assemble(err.message()))
        }
    }
}
