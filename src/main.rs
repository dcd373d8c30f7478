/*
 * Copyright (c) 2026 Ilya Shishov
 * Licensed under the MIT License.
 * See the LICENSE file in the project root for full license information.
 */

use std::io;

mod args;
mod framing;
mod modes;
mod opts;
mod sock;
mod sockets;
mod test_helpers;

use crate::args::ZmqPipeArgs;

fn main() -> io::Result<()> {
    let mut command = ZmqPipeArgs::get_scenario();
    command.execute();
    Ok(())
}
