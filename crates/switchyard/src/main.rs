use std::io::{self, Write};

fn main() {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout().lock();
    let mut err = io::stderr().lock();

    let code = switchyard::run(std::env::args_os(), &mut input, &mut out, &mut err);

    let _ = out.flush();
    std::process::exit(code);
}
