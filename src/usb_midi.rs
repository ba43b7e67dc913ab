//! USB-MIDI event packets carrying SysEx.
//!
//! A SysEx message is cut into 4-byte groups. The first byte of each group
//! holds the cable number in its high nibble and the code index number (CIN)
//! in its low nibble; the remaining three bytes carry up to three bytes of the
//! message.

use heapless::Vec;

pub const GROUP_SIZE: usize = 4;
pub const PADDING: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeIndex {
	SysexStartsOrContinues,
	SysexEndsWithOne,
	SysexEndsWithTwo,
	SysexEndsWithThree,
}

impl CodeIndex {
	/// Returns `None` for every CIN that is not part of a SysEx transfer.
	pub fn from_header(header: u8) -> Option<CodeIndex> {
		match header & 0x0F {
			0x4 => Some(CodeIndex::SysexStartsOrContinues),
			0x5 => Some(CodeIndex::SysexEndsWithOne),
			0x6 => Some(CodeIndex::SysexEndsWithTwo),
			0x7 => Some(CodeIndex::SysexEndsWithThree),
			_ => None,
		}
	}

	pub fn to_u8(&self) -> u8 {
		match self {
			CodeIndex::SysexStartsOrContinues => 0x4,
			CodeIndex::SysexEndsWithOne => 0x5,
			CodeIndex::SysexEndsWithTwo => 0x6,
			CodeIndex::SysexEndsWithThree => 0x7,
		}
	}

	pub fn payload_length(&self) -> usize {
		match self {
			CodeIndex::SysexStartsOrContinues | CodeIndex::SysexEndsWithThree => 3,
			CodeIndex::SysexEndsWithTwo => 2,
			CodeIndex::SysexEndsWithOne => 1,
		}
	}

	pub fn ends_sysex(&self) -> bool {
		*self != CodeIndex::SysexStartsOrContinues
	}
}

pub fn cable(header: u8) -> u8 {
	header >> 4
}

pub fn header(cable: u8, cin: CodeIndex) -> u8 {
	(cable & 0x0F) << 4 | cin.to_u8()
}

/// Iterator over the USB-MIDI groups of one SysEx message.
pub struct SysexPackets<'a> {
	cable: u8,
	remaining: &'a [u8],
}

pub fn sysex_packets(cable: u8, message: &[u8]) -> SysexPackets<'_> {
	SysexPackets { cable, remaining: message }
}

impl Iterator for SysexPackets<'_> {
	type Item = [u8; GROUP_SIZE];

	fn next(&mut self) -> Option<[u8; GROUP_SIZE]> {
		// exactly three left must end the message, so check that before continuing
		let cin = match self.remaining.len() {
			0 => return None,
			1 => CodeIndex::SysexEndsWithOne,
			2 => CodeIndex::SysexEndsWithTwo,
			3 => CodeIndex::SysexEndsWithThree,
			_ => CodeIndex::SysexStartsOrContinues,
		};
		let (chunk, rest) = self.remaining.split_at(cin.payload_length());
		self.remaining = rest;

		let mut group = [header(self.cable, cin), PADDING, PADDING, PADDING];
		group[1..1 + chunk.len()].copy_from_slice(chunk);
		Some(group)
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		let n = (self.remaining.len() + 2) / 3;
		(n, Some(n))
	}
}

/// Appends the encoded groups of `message` to `out`, all or nothing.
pub fn encode_sysex<const N: usize>(cable: u8, message: &[u8], out: &mut Vec<u8, N>) -> Result<(), ()> {
	let groups = sysex_packets(cable, message);
	if out.len() + groups.size_hint().0 * GROUP_SIZE > out.capacity() {
		return Err(());
	}
	for group in groups {
		out.extend_from_slice(&group)?;
	}
	Ok(())
}
