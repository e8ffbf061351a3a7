pub mod logging;
pub mod session;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgAction, ColorChoice, Command,
};

pub const CMD_STATUS: &str = "status";
pub const CMD_LOGIN: &str = "login";
pub const CMD_CALLBACK: &str = "callback";
pub const CMD_LOGOUT: &str = "logout";
pub const CMD_PROFILE: &str = "profile";
pub const CMD_REQUEST: &str = "request";
pub const CMD_INFO: &str = "info";

pub const ARG_URL: &str = "url";
pub const ARG_NAME: &str = "name";
pub const ARG_PATH: &str = "path";
pub const ARG_METHOD: &str = "method";
pub const ARG_DATA: &str = "data";
pub const ARG_HEADER: &str = "header";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("authsession")
        .about("Client session manager for authenticated APIs")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new(CMD_STATUS).about("Check the session against the backend"))
        .subcommand(Command::new(CMD_LOGIN).about("Print the identity provider sign-in URL"))
        .subcommand(
            Command::new(CMD_CALLBACK)
                .about("Complete sign-in from the identity provider redirect URL")
                .arg(
                    Arg::new(ARG_URL)
                        .help("Redirect URL, example: /auth/success?token=...")
                        .required(true),
                ),
        )
        .subcommand(Command::new(CMD_LOGOUT).about("End the session and forget the credential"))
        .subcommand(
            Command::new(CMD_PROFILE)
                .about("Show the profile, or update the display name")
                .arg(
                    Arg::new(ARG_NAME)
                        .long("name")
                        .help("New display name"),
                ),
        )
        .subcommand(
            Command::new(CMD_REQUEST)
                .about("Call an API path with the session credential")
                .arg(
                    Arg::new(ARG_PATH)
                        .help("API path or absolute URL")
                        .required(true),
                )
                .arg(
                    Arg::new(ARG_METHOD)
                        .short('X')
                        .long("method")
                        .help("HTTP method")
                        .default_value("GET"),
                )
                .arg(
                    Arg::new(ARG_DATA)
                        .short('d')
                        .long("data")
                        .help("JSON request body"),
                )
                .arg(
                    Arg::new(ARG_HEADER)
                        .short('H')
                        .long("header")
                        .help("Extra header as 'Name: value'")
                        .action(ArgAction::Append),
                ),
        )
        .subcommand(Command::new(CMD_INFO).about("Show build and configuration details"));

    let command = session::with_args(command);
    logging::with_args(command)
}
