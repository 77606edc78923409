extern crate log;
extern crate simplelog;

use std::fs::File;

use pascaline::compiler::lexer::tokens::Token;
use pascaline::compiler::lexer::Lexer;
use pascaline::compiler::parser::{self, ParserError};
use pascaline::compiler::x86;
use pascaline::diagnostics::TracingConfig;
use pascaline::*;

fn main() -> Result<(), i32> {
    let config = configure_cli().get_matches();

    if let Some(level) = get_log_level(&config) {
        configure_logging(level).expect("Failed to configure logger.")
    }

    parser::set_tracing(TracingConfig::parse(config.value_of("trace-parser")));

    let input = config
        .value_of("input")
        .expect("Expected an input source file to compile");
    let text = match std::fs::read_to_string(input) {
        Ok(text) => text,
        Err(e) => {
            print_errs(&[format!("{}: {}", input, e)]);
            return Err(ERR_NO_SOURCE);
        }
    };

    let tokens: Vec<Token> = match Lexer::new(&text).tokenize().into_iter().collect() {
        Ok(tokens) => tokens,
        Err(err) => {
            print_errs(&[format!("{}", err)]);
            return Err(ERR_LEXER_ERROR);
        }
    };

    if config.is_present("tokens") {
        for token in &tokens {
            println!("{}", token);
        }
    }

    let program = match parser::parse(&tokens) {
        Ok(program) => program,
        Err(err) => {
            let code = match err.inner_ref() {
                ParserError::Semantic(_) => ERR_TYPE_CHECK,
                _ => ERR_PARSER_ERROR,
            };
            print_errs(&[format!("{}", err)]);
            return Err(code);
        }
    };

    if config.is_present("ast") {
        println!("{}", program);
    }

    let code = x86::generate(&program);
    let output = config.value_of("output").unwrap_or("./target/output.asm");
    match File::create(output)
        .map_err(|e| format!("{}", e))
        .and_then(|mut f| x86::assembly::print(&code, &mut f).map_err(|e| format!("{}", e)))
    {
        Ok(()) => Ok(()),
        Err(e) => {
            print_errs(&[format!("Failed to write {}: {}", output, e)]);
            Err(ERR_ASM_WRITE_ERROR)
        }
    }
}
