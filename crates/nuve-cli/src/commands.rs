//! Resource subcommands - one per Nuve REST operation

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use nuve_client::{NuveClient, ResponseBody};
use nuve_mauth::{sign_request, Actor};
use serde_json::Value;
use tracing::debug;

/// Manage rooms
#[derive(Args, Debug)]
pub struct RoomsArgs {
    #[command(subcommand)]
    pub command: RoomsCommand,
}

#[derive(Subcommand, Debug)]
pub enum RoomsCommand {
    /// List all rooms of the service
    List,

    /// Show a single room
    Get {
        /// Room ID
        room: String,
    },

    /// Create a room
    Create {
        /// Room name
        name: String,

        /// Room options as JSON
        #[arg(long, default_value = "{}")]
        options: String,
    },

    /// Replace a room's name and options
    Update {
        /// Room ID
        room: String,

        /// New room name
        name: String,

        /// Room options as JSON
        #[arg(long, default_value = "{}")]
        options: String,
    },

    /// Merge new options into a room
    Patch {
        /// Room ID
        room: String,

        /// Room name
        name: String,

        /// Room options as JSON
        #[arg(long, default_value = "{}")]
        options: String,
    },

    /// Delete a room
    Delete {
        /// Room ID
        room: String,
    },
}

/// Issue room access tokens
#[derive(Args, Debug)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub command: TokenCommand,
}

#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Create a token for a user acting with a role
    Create {
        /// Room ID
        room: String,

        /// Acting username
        username: String,

        /// Acting role
        role: String,
    },
}

/// Manage services (superservice only)
#[derive(Args, Debug)]
pub struct ServicesArgs {
    #[command(subcommand)]
    pub command: ServicesCommand,
}

#[derive(Subcommand, Debug)]
pub enum ServicesCommand {
    /// List all services
    List,

    /// Show a single service
    Get {
        /// Service ID
        service: String,
    },

    /// Create a service
    Create {
        /// Service name
        name: String,

        /// Shared key for the new service
        service_key: String,
    },

    /// Delete a service
    Delete {
        /// Service ID
        service: String,
    },
}

/// Inspect users connected to a room
#[derive(Args, Debug)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    /// List users in a room
    List {
        /// Room ID
        room: String,
    },

    /// Show a single user
    Get {
        /// Room ID
        room: String,

        /// Username
        user: String,
    },

    /// Disconnect a user from a room
    Delete {
        /// Room ID
        room: String,

        /// Username
        user: String,
    },
}

/// Print a signed Authorization header (for debugging)
#[derive(Args, Debug)]
pub struct SignArgs {
    /// Acting username
    #[arg(long, requires = "role")]
    pub username: Option<String>,

    /// Acting role
    #[arg(long, requires = "username")]
    pub role: Option<String>,
}

pub fn rooms(client: &NuveClient, args: RoomsArgs) -> Result<()> {
    let body = match args.command {
        RoomsCommand::List => client.get_rooms(None)?,
        RoomsCommand::Get { room } => client.get_room(&room, None)?,
        RoomsCommand::Create { name, options } => {
            client.create_room(&name, &parse_options(&options)?, None)?
        }
        RoomsCommand::Update {
            room,
            name,
            options,
        } => client.update_room(&room, &name, &parse_options(&options)?, None)?,
        RoomsCommand::Patch {
            room,
            name,
            options,
        } => client.patch_room(&room, &name, &parse_options(&options)?, None)?,
        RoomsCommand::Delete { room } => client.delete_room(&room, None)?,
    };
    print_body(&body)
}

pub fn token(client: &NuveClient, args: TokenArgs) -> Result<()> {
    let body = match args.command {
        TokenCommand::Create {
            room,
            username,
            role,
        } => client.create_token(&room, &username, &role, None)?,
    };
    print_body(&body)
}

pub fn services(client: &NuveClient, args: ServicesArgs) -> Result<()> {
    let body = match args.command {
        ServicesCommand::List => client.get_services(None)?,
        ServicesCommand::Get { service } => client.get_service(&service, None)?,
        ServicesCommand::Create { name, service_key } => {
            client.create_service(&name, &service_key, None)?
        }
        ServicesCommand::Delete { service } => client.delete_service(&service, None)?,
    };
    print_body(&body)
}

pub fn users(client: &NuveClient, args: UsersArgs) -> Result<()> {
    let body = match args.command {
        UsersCommand::List { room } => client.get_users(&room, None)?,
        UsersCommand::Get { room, user } => client.get_user(&room, &user, None)?,
        UsersCommand::Delete { room, user } => client.delete_user(&room, &user, None)?,
    };
    print_body(&body)
}

pub fn sign(client: &NuveClient, args: SignArgs) -> Result<()> {
    let actor = match (args.username, args.role) {
        (Some(username), Some(role)) => Some(Actor::new(username, role)),
        _ => None,
    };

    let signed = sign_request(client.credentials(), actor.as_ref());
    debug!(
        timestamp = signed.timestamp,
        nonce = signed.nonce,
        "signed header"
    );

    println!("Authorization: {}", signed.authorization);
    Ok(())
}

/// Parse `--options` as a JSON value
pub fn parse_options(options: &str) -> Result<Value> {
    serde_json::from_str(options).with_context(|| format!("Invalid JSON in --options: {options}"))
}

fn print_body(body: &ResponseBody) -> Result<()> {
    println!("{}", render_body(body)?);
    Ok(())
}

fn render_body(body: &ResponseBody) -> Result<String> {
    Ok(match body {
        ResponseBody::Json(value) => serde_json::to_string_pretty(value)?,
        ResponseBody::Text(text) => text.clone(),
        ResponseBody::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    })
}
