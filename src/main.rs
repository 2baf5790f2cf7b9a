use jvmasm::assemble::{self, reader, ClassAssembler, Settings};

use clap::{crate_version, Arg, ArgAction, Command};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

/// Character encoding of source files
#[derive(Debug, Copy, Clone)]
enum Encoding {
    Utf8,
    Latin1,
}

impl Encoding {
    fn from_name(name: &str) -> Encoding {
        match name {
            "latin-1" | "latin1" | "iso-8859-1" => Encoding::Latin1,
            _ => Encoding::Utf8,
        }
    }

    fn decode(self, bytes: Vec<u8>) -> io::Result<String> {
        match self {
            Encoding::Utf8 => String::from_utf8(bytes)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err)),
            Encoding::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
        }
    }
}

fn main() -> Result<(), assemble::Error> {
    env_logger::init();

    let matches = Command::new("jvmasm")
        .version(crate_version!())
        .about("Assemble Jasmin-style sources into JVM class files")
        .arg(
            Arg::new("dest")
                .short('d')
                .long("dest")
                .value_name("DIRECTORY")
                .default_value(".")
                .action(ArgAction::Set)
                .help("Directory into which class files are written"),
        )
        .arg(
            Arg::new("encoding")
                .short('e')
                .long("encoding")
                .value_name("ENCODING")
                .default_value("utf-8")
                .value_parser(["utf-8", "utf8", "latin-1", "latin1", "iso-8859-1"])
                .action(ArgAction::Set)
                .help("Encoding of the source files"),
        )
        .arg(
            Arg::new("line numbers")
                .short('g')
                .action(ArgAction::SetTrue)
                .help("Add line numbers for every source line with an instruction"),
        )
        .arg(
            Arg::new("FILES")
                .required(true)
                .num_args(1..)
                .action(ArgAction::Append)
                .help("Source files to assemble"),
        )
        .get_matches();

    let dest = Path::new(matches.get_one::<String>("dest").map_or(".", String::as_str));
    let encoding = Encoding::from_name(
        matches
            .get_one::<String>("encoding")
            .map_or("utf-8", String::as_str),
    );
    let auto_line_numbers = matches.get_flag("line numbers");
    fs::create_dir_all(dest)?;

    let mut failed = 0;
    for file in matches.get_many::<String>("FILES").into_iter().flatten() {
        if let Err(err) = assemble_file(Path::new(file), dest, encoding, auto_line_numbers) {
            failed += 1;
            log::error!("Failed to assemble '{}'", file);
            match &err {
                assemble::Error::Assembly(diagnostics) => {
                    for diagnostic in diagnostics {
                        eprintln!("{}: {}", file, diagnostic);
                    }
                }
                other => eprintln!("{}: {}", file, other),
            }
            eprintln!("{}: found {} error(s)", file, err.error_count());
        }
    }

    if failed > 0 {
        process::exit(1);
    }
    Ok(())
}

/// Assemble one source file, returning the path of the class written
fn assemble_file(
    path: &Path,
    dest: &Path,
    encoding: Encoding,
    auto_line_numbers: bool,
) -> Result<PathBuf, assemble::Error> {
    log::info!("Reading '{}'", path.display());
    let source = encoding.decode(fs::read(path)?)?;

    let settings = Settings {
        auto_line_numbers,
        source_file: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
        ..Settings::default()
    };
    let mut assembler = ClassAssembler::new(settings);
    reader::read_source(&mut assembler, &source);
    let class_name = assembler.class_name().map(str::to_owned);
    let class_file = assembler.finish()?;

    // Nested directories come from the package of the class
    let output = dest.join(format!("{}.class", class_name.unwrap_or_default()));
    log::info!("Writing '{}'", output.display());
    if let Err(err) = class_file.save_to_path(&output, true) {
        let _ = fs::remove_file(&output);
        return Err(err.into());
    }
    Ok(output)
}
