use clap::{App, Arg, ArgMatches};
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

// Exit codes for the different types of errors
pub const ERR_TYPE_CHECK: i32 = 1;
pub const ERR_NO_SOURCE: i32 = 2;
pub const ERR_PARSER_ERROR: i32 = 3;
pub const ERR_ASM_WRITE_ERROR: i32 = 4;
pub const ERR_LEXER_ERROR: i32 = 5;

pub fn print_errs(errs: &[String]) {
    for e in errs {
        println!("{}", e);
    }
}

pub fn configure_cli() -> clap::App<'static, 'static> {
    App::new("Pascaline Compiler")
        .version("0.1.0")
        .about("Compiles Pascal style source files into x86 assembly for use by the NASM assembler")
        .arg(
            Arg::with_name("input")
                .short("i")
                .long("input")
                .takes_value(true)
                .required(true)
                .help("Source code file to compile"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .help("Name the output file that the assembly will be written to"),
        )
        .arg(
            Arg::with_name("tokens")
                .long("tokens")
                .help("Prints the token vector produced by the lexer"),
        )
        .arg(
            Arg::with_name("ast")
                .long("ast")
                .help("Prints the typed syntax tree produced by the parser"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Turns on debug level logging"),
        )
        .arg(
            Arg::with_name("trace-parser")
                .long("trace-parser")
                .takes_value(true)
                .help("Prints out a trace of all the steps the parser follows as it converts the token vector into an AST.  The current token is printed next to the step.
                This is for debugging the parser when adding new syntactical elements."),
        )
}

pub fn get_log_level(args: &ArgMatches) -> Option<LevelFilter> {
    if args.is_present("verbose") {
        Some(LevelFilter::Debug)
    } else {
        None
    }
}

pub fn configure_logging(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
}
