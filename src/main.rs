/*!
  Command line driver: assemble source text to an image, run an image, or disassemble one.

  Set `RUST_LOG=trace` to follow execution instruction by instruction.
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;
extern crate strum;
#[macro_use] extern crate strum_macros;
extern crate clap;

mod address;
mod bytecode;
mod error;
mod executor;
mod loader;
mod machine;

use std::fs::File;
use std::io::{self, Read, Write};

use log::{error, info};

use crate::bytecode::{disassemble, Assembly};
use crate::error::Error;
use crate::executor::Executor;
use crate::loader::{read_image, write_image};
use crate::machine::{Machine, MachineConfig};

/// The image name used when `asm` is not given `-o`.
const DEFAULT_IMAGE : &str = "dcpu.out";
/// A path of `-` is stdin or stdout.
const STDIO         : &str = "-";

fn get_cli_config<'a>() -> clap::ArgMatches<'a> {
  clap::App::new("dcpu")
    .version(env!("CARGO_PKG_VERSION"))
    .about("Assembler and emulator for a 16 bit word-addressed CPU")
    .setting(clap::AppSettings::SubcommandRequiredElseHelp)
    .subcommand(
      clap::SubCommand::with_name("asm")
        .about("Assemble source text into a binary image")
        .arg(
          clap::Arg::with_name("SOURCE")
            .required(true)
            .help("Source file, or - for stdin")
        )
        .arg(
          clap::Arg::with_name("output")
            .short("o")
            .long("output")
            .takes_value(true)
            .value_name("IMAGE")
            .default_value(DEFAULT_IMAGE)
            .help("Where to write the image, or - for stdout")
        )
        .arg(
          clap::Arg::with_name("listing")
            .long("listing")
            .help("Print each instruction's address and words next to its source")
        ),
    )
    .subcommand(
      clap::SubCommand::with_name("run")
        .about("Load an image at address zero and run it until it halts")
        .arg(
          clap::Arg::with_name("IMAGE")
            .required(true)
            .help("Image file, or - for stdin")
        )
        .arg(
          clap::Arg::with_name("memory")
            .long("memory")
            .takes_value(true)
            .value_name("WORDS")
            .help("Memory size in words, decimal or 0x hex (default 0x1000, at most 0x10000)")
        )
        .arg(
          clap::Arg::with_name("dump")
            .long("dump")
            .help("Print the registers and memory when the machine stops")
        ),
    )
    .subcommand(
      clap::SubCommand::with_name("disasm")
        .about("Print the instructions in an image")
        .arg(
          clap::Arg::with_name("IMAGE")
            .required(true)
            .help("Image file, or - for stdin")
        ),
    )
    .get_matches()
}

fn open_input(path: &str) -> Result<Box<dyn Read>, Error> {
  match path {
    STDIO => Ok(Box::new(io::stdin())),
    _     => Ok(Box::new(File::open(path)?))
  }
}

fn open_output(path: &str) -> Result<Box<dyn Write>, Error> {
  match path {
    STDIO => Ok(Box::new(io::stdout())),
    _     => Ok(Box::new(File::create(path)?))
  }
}

fn parse_memory_size(value: &str) -> Result<usize, Error> {
  let parsed =
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
      Some(hex) => usize::from_str_radix(hex, 16),
      None      => value.parse::<usize>()
    };
  parsed.map_err(|_| Error::Argument { option: "memory", value: value.to_string() })
}

fn assemble(matches: &clap::ArgMatches) -> Result<(), Error> {
  let source  = matches.value_of("SOURCE").unwrap_or(STDIO);
  let output  = matches.value_of("output").unwrap_or(DEFAULT_IMAGE);
  let listing = matches.is_present("listing");

  let mut text = String::new();
  open_input(source)?.read_to_string(&mut text)?;

  let assembly = Assembly::assemble(&text, listing);
  if listing {
    print!("{}", assembly.listing);
  }

  if !assembly.is_ok() {
    for syntax_error in assembly.errors.iter() {
      eprintln!("{}", syntax_error);
    }
    return Err(Error::Assembly(assembly.errors.len()));
  }

  write_image(&assembly.code, open_output(output)?)?;
  info!("Wrote {} words to {}.", assembly.code.len(), output);
  Ok(())
}

fn run(matches: &clap::ArgMatches) -> Result<(), Error> {
  let config =
    match matches.value_of("memory") {
      Some(value) => MachineConfig::new(parse_memory_size(value)?)?,
      None        => MachineConfig::default()
    };
  let image = read_image(open_input(matches.value_of("IMAGE").unwrap_or(STDIO))?)?;

  let mut machine = Machine::new(&config);
  machine.load(&image)?;
  info!("Loaded {} words into memory of {:#x} words.", image.len(), machine.capacity());

  let mut executor = Executor::new(&mut machine);
  let result       = executor.run();

  if matches.is_present("dump") {
    println!("{}", executor.machine());
  }

  let summary = result?;
  info!("Executed {} instructions, skipped {}.", summary.executed, summary.skipped);
  Ok(())
}

fn disassemble_image(matches: &clap::ArgMatches) -> Result<(), Error> {
  let image = read_image(open_input(matches.value_of("IMAGE").unwrap_or(STDIO))?)?;
  for (address, instruction) in disassemble(&image)? {
    println!("{:04x}: {}", address, instruction);
  }
  Ok(())
}

fn main() {
  env_logger::init();

  let matches = get_cli_config();
  let result =
    match matches.subcommand() {
      ("asm",    Some(sub_matches)) => assemble(sub_matches),
      ("run",    Some(sub_matches)) => run(sub_matches),
      ("disasm", Some(sub_matches)) => disassemble_image(sub_matches),
      _                             => Ok(())
    };

  if let Err(e) = result {
    error!("{}", e);
    std::process::exit(1);
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn memory_sizes(){
    assert_eq!(parse_memory_size("4096").ok(), Some(0x1000));
    assert_eq!(parse_memory_size("0x10000").ok(), Some(0x10000));
    assert!(parse_memory_size("lots").is_err());
  }

  #[test]
  fn assemble_run_and_disassemble(){
    let assembly = Assembly::assemble("set a, 0x30\nadd a, 2\nhlt\n", false);
    let mut bytes = Vec::new();
    write_image(&assembly.code, &mut bytes).unwrap();

    let image = read_image(&bytes[..]).unwrap();
    let mut machine = Machine::new(&MachineConfig::default());
    machine.load(&image).unwrap();
    Executor::new(&mut machine).run().unwrap();
    assert_eq!(machine.register(bytecode::Register::A), 0x32);

    let text: Vec<String> =
      disassemble(&image).unwrap()
                         .iter()
                         .map(|(_, instruction)| instruction.to_string())
                         .collect();
    assert_eq!(text, vec!["SET A, 0x0030", "ADD A, 2", "HLT"]);
    // The disassembly assembles back to the same words.
    assert_eq!(Assembly::assemble(&text.join("\n"), false).code, image);
  }
}
