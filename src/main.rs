use clap::{Args, Parser, Subcommand};
use simple_lang::{
    interpreter::{ExecutionError, Interpreter, DEFAULT_MAX_DEPTH},
    parser::ParseErrorWithContext,
    resolver::Resolver,
    tokenizer::{Token, TokenizeError, Tokenizer},
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a token listing file
    Run(RunArgs),
    /// Run the built-in reference program
    Demo(DemoArgs),
    /// Print a token listing file
    Tokens(TokensArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    file: String,
    /// Nested user-function calls allowed before execution stops
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH, conflicts_with = "unbounded")]
    max_depth: usize,
    /// Run without a call depth limit
    #[arg(long)]
    unbounded: bool,
    /// Print the parsed program before running it
    #[arg(long)]
    dump: bool,
}

#[derive(Debug, Args)]
struct DemoArgs {
    /// Print the parsed program before running it
    #[arg(long)]
    dump: bool,
}

#[derive(Debug, Args)]
struct TokensArgs {
    file: String,
    /// Print in listing form instead of columns
    #[arg(long)]
    listing: bool,
}

fn main() {
    init_tracing();
    let args = Cli::parse();

    let result = match &args.command {
        Some(Command::Run(args)) => run_command(args),
        Some(Command::Demo(args)) => demo_command(args.dump),
        Some(Command::Tokens(args)) => tokens_command(args),
        None => demo_command(false),
    };

    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let default_level = if cfg!(feature = "trace") {
        "trace"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run_command(args: &RunArgs) -> Result<(), InterpretError> {
    let tokens = simple_lang::tokenizer::read_tokens(&args.file)?;
    let max_depth = (!args.unbounded).then_some(args.max_depth);
    interpret(Tokenizer::new(tokens), max_depth, args.dump)
}

fn demo_command(dump: bool) -> Result<(), InterpretError> {
    interpret(Tokenizer::reference(), Some(DEFAULT_MAX_DEPTH), dump)
}

fn tokens_command(args: &TokensArgs) -> Result<(), InterpretError> {
    let tokens = simple_lang::tokenizer::read_tokens(&args.file)?;
    if args.listing {
        print!("{}", simple_lang::tokenizer::listing(&tokens)?);
        return Ok(());
    }
    for (i, token) in tokens.iter().enumerate() {
        print_token(i, token);
    }
    Ok(())
}

fn print_token(index: usize, token: &Token) {
    println!(
        "{:4} {:<10} {}",
        index,
        format!("{:?}", token.token_type),
        token.lexeme
    );
}

#[derive(Debug, thiserror::Error)]
enum InterpretError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
    #[error(transparent)]
    Parse(#[from] ParseErrorWithContext),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

fn interpret(
    mut tokenizer: Tokenizer,
    max_depth: Option<usize>,
    dump: bool,
) -> Result<(), InterpretError> {
    let mut program = simple_lang::parser::program(&mut tokenizer)?;
    if dump {
        print!("{program}");
    }

    Resolver::new().resolve(&mut program);

    Interpreter::default()
        .with_max_depth(max_depth)
        .interpret(&program)?;
    Ok(())
}
