/// Hexdump a program with addresses starting at the address the program is loaded at.
///
/// E.g. `200: 60 05 70 03 d0 01`
pub fn hexdump(program: &[u8], program_offset: u16, addr_width: usize, stride: usize) -> String {
    program
        .chunks(stride)
        .enumerate()
        .map(|(line, bytes)| {
            let offset = program_offset as usize + line * stride;
            let bytes = bytes
                .iter()
                .map(|byte| format!("{:02x}", byte))
                .collect::<Vec<String>>()
                .join(" ");
            format!("{:0width$x}: {}", offset, bytes, width = addr_width)
        })
        .collect::<Vec<String>>()
        .join("\n")
}
