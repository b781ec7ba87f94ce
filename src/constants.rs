/// 隐藏数据流开头的魔数，用于判断图像中是否存在有效载荷。
pub const MAGIC: [u8; 4] = *b"STEG";

/// 头部固定长度 (字节)：魔数 (4) + 载荷长度 (4, 大端) + SHA-256 摘要 (32) + 标志位 (1)。
pub const HEADER_SIZE: usize = 4 + 4 + CHECKSUM_SIZE + 1;

/// SHA-256 摘要长度 (字节)。
pub const CHECKSUM_SIZE: usize = 32;

/// 每个像素参与隐写的颜色通道数 (R, G, B)。
pub const CHANNELS: usize = 3;

/// 标志位中 bits-per-channel 字段的掩码 (bit 0-1)。
pub const FLAG_BITS_MASK: u8 = 0b0000_0011;

/// 自适应像素选择标志 (bit 2)。
pub const FLAG_ADAPTIVE: u8 = 0b0000_0100;

/// 载荷已加密标志 (bit 3)。
pub const FLAG_ENCRYPTED: u8 = 0b0000_1000;

/// 保留位 (bit 4-7)，写入时为零，读取时忽略。
pub const FLAG_RESERVED_MASK: u8 = 0b1111_0000;

/// 纹理图计算前清除的低位掩码。
/// 最多 2 bit 会被改写，所以清除这两位后，载体图像与隐写图像的纹理图完全一致。
pub const TEXTURE_MASK: u8 = 0b1111_1100;

/// PBKDF2 盐的长度 (字节)。
pub const SALT_LEN: usize = 16;

/// AES-CBC 初始化向量长度 (字节)。
pub const IV_LEN: usize = 16;

/// AES-256 密钥长度 (字节)。
pub const KEY_LEN: usize = 32;

/// PBKDF2-HMAC-SHA256 迭代次数。
pub const PBKDF2_ROUNDS: u32 = 100_000;
