use std::io::IsTerminal;

use afchat_frame::{command_name, ChatEvent, FrameFields};
use afchat_resolve::{BroadcastRef, ChatEndpoint};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

pub fn print_chat(event: &ChatEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(event),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TIME", "NICKNAME", "USER", "COMMENT"])
                .add_row(vec![
                    event.timestamp.format("%H:%M:%S").to_string(),
                    event.nickname.clone(),
                    event.user_id.clone(),
                    event.comment.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{event}"),
        OutputFormat::Raw => println!("{}", event.comment),
    }
}

#[derive(Serialize)]
struct EndpointOutput<'a> {
    broadcast: String,
    chat_url: String,
    #[serde(flatten)]
    endpoint: &'a ChatEndpoint,
}

pub fn print_endpoint(broadcast: &BroadcastRef, endpoint: &ChatEndpoint, format: OutputFormat) {
    let chat_url = endpoint.target(broadcast).url();
    match format {
        OutputFormat::Json => print_json(&EndpointOutput {
            broadcast: broadcast.to_string(),
            chat_url,
            endpoint,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["broadcast".to_string(), broadcast.to_string()])
                .add_row(vec!["title".to_string(), endpoint.title.clone()])
                .add_row(vec!["broadcaster".to_string(), endpoint.broadcaster_id.clone()])
                .add_row(vec!["chat domain".to_string(), endpoint.chat_domain.clone()])
                .add_row(vec!["chat port".to_string(), endpoint.chat_port.to_string()])
                .add_row(vec!["channel".to_string(), endpoint.chat_channel_no.clone()])
                .add_row(vec!["chat url".to_string(), chat_url]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("title:       {}", endpoint.title);
            println!("broadcaster: {}", endpoint.broadcaster_id);
            println!("channel:     {}", endpoint.chat_channel_no);
            println!("chat url:    {chat_url}");
        }
        OutputFormat::Raw => println!("{chat_url}"),
    }
}

#[derive(Serialize)]
struct DecodedOutput<'a> {
    command: Option<u16>,
    command_name: Option<&'static str>,
    body_len: Option<usize>,
    fields: Vec<&'a str>,
    chat: Option<&'a ChatEvent>,
}

pub fn print_decoded(fields: &FrameFields, chat: Option<&ChatEvent>, format: OutputFormat) {
    let header = fields.header();
    match format {
        OutputFormat::Json => print_json(&DecodedOutput {
            command: header.map(|h| h.command),
            command_name: header.map(|h| command_name(h.command)),
            body_len: header.map(|h| h.body_len),
            fields: fields.iter().collect(),
            chat,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["INDEX", "FIELD"]);
            for (index, field) in fields.iter().enumerate() {
                table.add_row(vec![index.to_string(), printable(field)]);
            }
            println!("{table}");
            println!("{}", chat_verdict(chat));
        }
        OutputFormat::Pretty => {
            if let Some(header) = header {
                println!(
                    "command={} ({}) body_len={}",
                    header.command,
                    command_name(header.command),
                    header.body_len
                );
            }
            for (index, field) in fields.iter().enumerate() {
                println!("[{index}] {}", printable(field));
            }
            println!("{}", chat_verdict(chat));
        }
        OutputFormat::Raw => {
            if let Some(event) = chat {
                println!("{}", event.comment);
            }
        }
    }
}

fn chat_verdict(chat: Option<&ChatEvent>) -> String {
    match chat {
        Some(event) => format!("chat: {event}"),
        None => "chat: none (control frame)".to_string(),
    }
}

/// Escape control characters so headers and separators stay visible.
fn printable(field: &str) -> String {
    field.escape_debug().to_string()
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}
