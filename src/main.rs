/*!
  The `duet` binary: loads one program image into a fresh machine, runs it to
  a halt, and dumps the final register and memory state in hex.
*/

use std::env;
use std::fs;
use std::process;

use anyhow::{bail, Context, Result};
use env_logger::Env;
use log::info;

use duet::Machine;

const USAGE: &str = "usage: duet <program>";

fn main() {
  env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

  if let Err(error) = run() {
    eprintln!("duet: {:#}", error);
    process::exit(1);
  }
}

fn run() -> Result<()> {
  let mut args = env::args().skip(1);
  let path = match (args.next(), args.next()) {
    (Some(path), None) => path,
    (None, _)          => bail!("missing path argument\n{}", USAGE),
    (Some(_), Some(_)) => bail!("too many arguments\n{}", USAGE),
  };

  let image = fs::read(&path).with_context(|| format!("cannot read {}", path))?;

  let mut machine = Machine::new();
  machine.load_image(&image)?;
  info!("loaded {} bytes from {}", image.len(), path);

  let halt = machine.run()?;
  info!("execution halted: {:?}", halt);

  print!("{}", machine.dump_registers());
  println!();
  print!("{}", machine.dump_memory());

  Ok(())
}
