use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    qwen_mcp::cli::main()
}
