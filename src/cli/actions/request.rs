use crate::cli::{actions::print_json, globals::GlobalArgs};
use crate::session::RequestOptions;
use anyhow::{anyhow, Context, Result};
use reqwest::Method;
use serde_json::Value;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub path: String,
    pub method: String,
    pub data: Option<String>,
    pub headers: Vec<String>,
}

impl Args {
    /// Builds gateway options from the raw command-line values.
    ///
    /// # Errors
    /// Returns an error for an unknown method, a body that is not JSON, or a
    /// header without a `Name: value` separator.
    pub fn options(&self) -> Result<RequestOptions> {
        let method = Method::from_bytes(self.method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| anyhow!("invalid HTTP method: {}", self.method))?;

        let body = self
            .data
            .as_deref()
            .map(serde_json::from_str::<Value>)
            .transpose()
            .context("--data must be valid JSON")?;

        let headers = self
            .headers
            .iter()
            .map(|raw| parse_header(raw))
            .collect::<Result<Vec<_>>>()?;

        Ok(RequestOptions {
            method,
            body,
            headers,
        })
    }
}

fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("header must look like 'Name: value': {raw}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("header name is empty: {raw}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Call an API path through the session gateway and print the JSON body.
///
/// # Errors
/// Returns an error if the options are invalid or the call fails.
pub async fn execute(args: Args) -> Result<()> {
    let options = args.options()?;
    let manager = args.globals.manager()?;

    let body = manager
        .gateway()
        .request(&args.path, options)
        .await
        .with_context(|| format!("request to {} failed", args.path))?;

    print_json(&body)
}
