mod recognize;

use recognize::run_recognize;

use anyhow::Result;

use crate::cli::Command;
use crate::display::Context;

pub fn dispatch(command: Command, ctx: Context) -> Result<()> {
    match command {
        Command::Recognize(args) => run_recognize(args, ctx),
    }
}
