use super::{disassemble_code, Item};

/// Generate listing line from an item and its memory address
///
/// E.g. `$0200  60 05  LD V0, #$05`
pub fn generate_line(addr: usize, item: &Item) -> String {
    let bytes_str = item
        .bytes()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<String>>()
        .join(" ");

    format!("${:04x}  {:<5}  {}\n", addr, bytes_str, item)
}

/// Generate a listing of an image loaded at `load_base`.
#[tracing::instrument(skip(bytes))]
pub fn generate(load_base: u16, bytes: &[u8]) -> String {
    let mut str = String::new();
    str.push_str(" Addr  Hexdump  Instructions\n");
    str.push_str("----------------------------\n");
    //            $0200  60 05  LD V0, #$05

    for (offset, item) in disassemble_code(bytes) {
        str.push_str(&generate_line(load_base as usize + offset, &item));
    }

    str
}
