//! UBX 校验和（8 位 Fletcher 算法）
//!
//! 覆盖范围为 class 字节到负载末尾（不含起始标记和校验和本身）。

/// 计算 UBX 校验和，返回 `[CK_A, CK_B]`
pub fn ubx_checksum(bytes: &[u8]) -> [u8; 2] {
    let (ck_a, ck_b) = bytes.iter().fold((0u8, 0u8), |(a, b), &byte| {
        let a = a.wrapping_add(byte);
        (a, b.wrapping_add(a))
    });
    [ck_a, ck_b]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(ubx_checksum(&[]), [0, 0]);
    }

    #[test]
    fn test_known_sequence() {
        // CFG-PRT 轮询消息：B5 62 06 00 00 00 -> 06 18
        assert_eq!(ubx_checksum(&[0x06, 0x00, 0x00, 0x00]), [0x06, 0x18]);
    }

    #[test]
    fn test_wrapping() {
        let bytes = [0xFF; 300];
        let [a, _] = ubx_checksum(&bytes);
        assert_eq!(a, (0xFFu32 * 300 % 256) as u8);
    }
}
