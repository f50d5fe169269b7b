use afchat_resolve::{BroadcastRef, EndpointResolver, LiveApiResolver};

use crate::cmd::{runtime, ResolveArgs};
use crate::exit::{resolution_error, url_error, CliResult, SUCCESS};
use crate::output::{print_endpoint, OutputFormat};

pub fn run(args: ResolveArgs, format: OutputFormat) -> CliResult<i32> {
    let broadcast = BroadcastRef::parse(&args.url).map_err(url_error)?;
    let resolver = live_resolver(args.api_url)?;

    let endpoint = runtime()?
        .block_on(resolver.resolve(&broadcast))
        .map_err(|err| resolution_error("resolve failed", err))?;

    print_endpoint(&broadcast, &endpoint, format);
    Ok(SUCCESS)
}

pub(crate) fn live_resolver(api_url: Option<String>) -> CliResult<LiveApiResolver> {
    let resolver = match api_url {
        Some(url) => LiveApiResolver::with_api_url(url),
        None => LiveApiResolver::new(),
    };
    resolver.map_err(|err| resolution_error("http client setup failed", err))
}
