use clap::Parser;


#[derive(Parser)]
#[clap(author, version, about)]
pub struct CliParser {

    /// Source file basenames to assemble. Each `<name>` is read from
    /// `<name>.as` and assembles to `<name>.ob` plus the optional map files.
    #[clap(value_parser, required = true)]
    pub input_files: Vec<String>,

    /// Just check the sources without writing the output files
    #[clap(short = 'c', long = "check", action)]
    pub check: bool,

    /// Run the assembler in verbose mode
    #[clap(short = 'v', action)]
    pub verbose: bool,

}
