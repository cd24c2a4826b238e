/// Classic hex + ASCII dump of `start..=end`, fetching bytes through `read`.
pub fn hexdump(read: impl Fn(u16) -> u8, start: u16, end: u16) -> String {
    let mut str = String::new();
    let mut addr = start;
    let mut done = false;
    while !done {
        let mut line = format!("{:04x}: ", addr);
        let mut chars = String::new();
        for _ in 0..16 {
            let byte = read(addr);
            line.push_str(&format!("{:02x} ", byte));
            let c = byte as char;
            chars.push(if c.is_ascii_graphic() || c == ' ' {
                c
            } else {
                '.'
            });

            if addr == end {
                done = true;
                break;
            }
            addr = addr.wrapping_add(1);
        }

        let dump_line = format!("{:<54} {}\n", line, chars);
        str.push_str(&dump_line);
    }

    str
}
