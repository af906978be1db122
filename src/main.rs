fn main() {
    if let Err(err) = svg_diagram_themer::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
