/*!
  The `duet-asm` binary: assembles a textual program into a flat binary image
  the `duet` emulator loads.
*/

use std::env;
use std::fs;
use std::process;

use anyhow::{bail, Context, Result};
use env_logger::Env;
use log::info;

use duet::bytecode::assemble;

const USAGE: &str = "usage: duet-asm <source> <output>";

fn main() {
  env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

  if let Err(error) = run() {
    eprintln!("duet-asm: {:#}", error);
    process::exit(1);
  }
}

fn run() -> Result<()> {
  let mut args = env::args().skip(1);
  let (source, output) = match (args.next(), args.next(), args.next()) {
    (Some(source), Some(output), None) => (source, output),
    _ => bail!("{}", USAGE),
  };

  let text = fs::read_to_string(&source)
    .with_context(|| format!("cannot read {}", source))?;
  let image = assemble(&text)?;
  fs::write(&output, &image)
    .with_context(|| format!("cannot write {}", output))?;

  info!("wrote {} bytes to {}", image.len(), output);
  Ok(())
}
