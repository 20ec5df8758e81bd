//! Hash command - print a request fingerprint

use super::build_request;
use crate::cli::args::HashArgs;
use crate::error::IhppResult;
use crate::request::fingerprint;

/// Execute the hash command
pub async fn execute(args: HashArgs) -> IhppResult<()> {
    let request = build_request(&args.request).with_timestamp(args.timestamp);
    println!("{}", fingerprint(&request));
    Ok(())
}
