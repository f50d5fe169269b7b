use afchat_frame::{classify_chat_event, decode_frame};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_decoded, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let raw = frame_bytes(&args)?;
    let fields = decode_frame(&raw).map_err(|err| frame_error("decode failed", err))?;
    let chat = classify_chat_event(&fields);

    print_decoded(&fields, chat.as_ref(), format);
    Ok(SUCCESS)
}

fn frame_bytes(args: &DecodeArgs) -> CliResult<Vec<u8>> {
    if let Some(text) = &args.hex {
        let compact: String = text.split_whitespace().collect();
        return hex::decode(compact)
            .map_err(|err| CliError::new(DATA_INVALID, format!("invalid hex: {err}")));
    }
    if let Some(path) = &args.file {
        return std::fs::read(path)
            .map_err(|err| io_error(&format!("read {} failed", path.display()), err));
    }
    Err(CliError::new(USAGE, "one of --hex or --file is required"))
}
