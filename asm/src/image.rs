use arch::Word;

use crate::parser::DEFAULT_ADDRESS;

pub const STACK_ADDRESS: Word = 0x3FFFF;
pub const STACK_SIZE: Word = 0xF0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub address: Word,
    pub size: Word,
    /// Code: one group per instruction. Data: one group per word.
    pub words: Vec<Vec<Word>>,
}

impl Segment {
    pub fn new(address: Word) -> Self {
        Segment {
            address,
            size: 0,
            words: vec![],
        }
    }

    pub fn push(&mut self, group: Vec<Word>) {
        self.size += group.len() as Word;
        self.words.push(group);
    }

    fn header(&self, tag: char) -> String {
        format!("@{} {:05x} {:05x}", tag, self.address, self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub code: Segment,
    pub data: Option<Segment>,
    pub stack: Segment,
}

impl Default for Image {
    fn default() -> Self {
        Image {
            code: Segment::new(DEFAULT_ADDRESS),
            data: None,
            stack: Segment {
                address: STACK_ADDRESS,
                size: STACK_SIZE,
                words: vec![],
            },
        }
    }
}

fn hex_line(words: &[Word]) -> String {
    words
        .iter()
        .map(|w| format!("{:05x}", w))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Image {
    /// Loader text: code block, data block if any, stack header, `.` terminator.
    pub fn to_hex(&self) -> String {
        let mut out = vec![self.code.header('C')];
        out.extend(self.code.words.iter().map(|group| hex_line(group)));
        out.push(String::new());

        if let Some(data) = &self.data {
            out.push(data.header('D'));
            let words: Vec<Word> = data.words.iter().flatten().copied().collect();
            out.push(hex_line(&words));
            out.push(String::new());
        }

        out.push(self.stack.header('S'));
        out.push(".".to_string());
        out.join("\n") + "\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_only() {
        let mut image = Image::default();
        image.code.address = 0x100;
        image.code.push(vec![0x45F1]);
        image.code.push(vec![0x1A80, 300]);
        assert_eq!(
            image.to_hex(),
            "@C 00100 00003\n045f1\n01a80 0012c\n\n@S 3ffff 000f0\n.\n"
        );
    }

    #[test]
    fn with_data() {
        let mut image = Image::default();
        image.code.push(vec![0x45F1]);
        let mut data = Segment::new(0x200);
        data.push(vec![1, 2, 0x3FFFF]);
        image.data = Some(data);
        assert_eq!(
            image.to_hex(),
            "@C 3ffff 00001\n045f1\n\n@D 00200 00003\n00001 00002 3ffff\n\n@S 3ffff 000f0\n.\n"
        );
    }
}
