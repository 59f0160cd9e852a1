//! Fixed Gear table for content-defined chunking.
//!
//! These 256 constants drive the rolling fingerprint in
//! [`crate::chunker::Chunker`]. They are part of the on-disk format:
//! changing any entry moves every chunk boundary, which breaks
//! deduplication against existing repositories. Never regenerate.

/// One random 64-bit word per possible byte value.
pub const GEAR_TABLE: [u64; 256] = [
    0xd1584172d33b146f, 0x4708300fd24b10f3, 0xd62a75f5b85eaf19, 0xc40840316692a321,
    0x3d6670a2074ce2c8, 0xa169f56897c58dea, 0x8360b1175457aaa6, 0xd726f022e63b4f70,
    0x492da7759c0443a0, 0x6bff0299648c1a35, 0xe29676b27409b33a, 0x7c8ff045f4086b59,
    0xfea6055d62104e8f, 0x31ff15a1b7a86861, 0xd7d182f900dae393, 0xd66d0432c61a2487,
    0x2fe43f52ba63e51b, 0x8cdb0e9bb38318e9, 0x2994bfa43d9a6f9a, 0x03ab42cdbe41ccba,
    0x0f92ccde143d69d6, 0x85f92ff8f3c7234f, 0xbadb68b9a8de53a8, 0xf8212206148a1bb9,
    0x825070ca6ef4a3d4, 0xb274edb8991e77c8, 0xb60836eb293b89e4, 0xdf6a892971073c7c,
    0x83712b264566dfaf, 0xc38b6ef71caa1a4e, 0x2b201ec1c6937d10, 0x7f2d8378f64e731a,
    0x33c8bc5850bdcf26, 0x217a73b5fd7035bb, 0x099ea4318754b860, 0xaf4ccce21c0cbfb8,
    0x8daaec18fff10c86, 0x9341a84b529f72bb, 0xb45d5b06ae789412, 0x43c612971605805b,
    0xe3b8e78d43d69862, 0x2acaf2f058ebd6d3, 0x1d41b5deba8ec8cb, 0x7754a7b533a1f440,
    0xc3a5fe17c2b8f485, 0x8aa0bc30586ed1cc, 0xb807f876a7551e4e, 0xa6925eb544777414,
    0x2f147275bf906122, 0x7cd30d0305c28e55, 0x8bab1c34bae0835c, 0x132eff12866a9856,
    0x948b94a6689d7183, 0xce7554afd9ccc9c2, 0xf16b4af491e3395d, 0x95c06742ef472ef1,
    0x3d80ce6c3405487c, 0xab87680dac30376a, 0x24f6330e2bc2dbde, 0x2cf30a098c667cf8,
    0x21bc242ef117e3bb, 0x1a3d513bf3753ad6, 0xece6395f8baf9427, 0xbc51991e5faa150c,
    0x05430037221e5a40, 0x4469680657d275ba, 0x981f90dc860fe4f7, 0xb582de6b639ba36c,
    0x9f0b59dd82128b8e, 0xcb6c176f0a451cf4, 0x4f06b90116d3adac, 0xe660ecf809bb2ece,
    0x5f97ef93bf60f63d, 0xae2c34beec42765a, 0x26bc6841a03b592d, 0xb38ecd7fa5791fb8,
    0x2d5fc3237f77e7ec, 0x78d9a56463e14e5c, 0x183aedc06d66f956, 0xe709a054eb01f7bc,
    0x4df116002c7ae612, 0x5968785c2320f8b7, 0xd2c246fa1a558af8, 0x14efe00e5208ebcd,
    0x99d522ca79c4445e, 0x2c8aac5f30028c8f, 0x3c6454c85fba21fb, 0xaa363e50402d6e67,
    0x94ee51395ac25bfe, 0xa91b9c58fbc903d2, 0xbc75419f63c54a7e, 0x4142d4e00c6f693b,
    0x3c061f67f491274f, 0xe11938790cb8bf8f, 0x5d8c3965036001fc, 0xd56dc1dfc3ef35c6,
    0x9ecd847692206d82, 0x0b36c981bbcd9bd6, 0x1cb085df62997120, 0x68ab9ea29c1cb403,
    0x6e9f4e7db46c5b43, 0xb1e8305f93ea030f, 0x28eb134092f20144, 0x43e406773b5f5943,
    0xd573c5eda026dffa, 0xdb6f35da62b6249d, 0xfafb8e105fb1d954, 0xc589012c94337605,
    0x50910aae26a84404, 0x37e05efe3a6e4c6d, 0x17578dde82623ced, 0xea73094b6c899b32,
    0x468ac1985f9d9df2, 0x1846c29dc43dcbb2, 0x60fca7e06a7a4169, 0xca20e50db6b2ab06,
    0x9c6c94e0cfc9b899, 0xc40a8b86aa70b374, 0x6113b53e80e88a8b, 0x31246cb2c446ceed,
    0x90eb4d9ede727313, 0x5da5b05980cf88f6, 0xe72c0b57dd556678, 0x66b4ff63f2a88332,
    0xf12a72b9d49c1f4e, 0x7de3a1e486240f8b, 0xe8a5bd3980a8d9b7, 0xf3590ce14eff59c7,
    0xc923c908d1ff2363, 0x1a1df64e384d2ecb, 0x26346f4ced795e6d, 0x7e64319256025cff,
    0x03f1efa5e9779bb7, 0x74e11298c18ec357, 0xda0cb5395ef1bbd3, 0x693e4692bf760415,
    0xf9c721a182fab01b, 0x449e9491c7ae7308, 0x54d7b94e00933fe8, 0x67a31740fb6811f4,
    0x46d287c6bf3bd9c7, 0x0897b7de9a8c146b, 0x60d2863ae8551231, 0x6c85aad978ee7bae,
    0xd95a3b67c7a055b1, 0x4c8f25699b2cc6b4, 0x3a0fb1dcb1b39609, 0xcf08f3aeee3d76fe,
    0x3e6aefb8f1d69cac, 0xb307d4671cb399a3, 0x063b3cf942fa08f4, 0xedea0f0a43b3e2c1,
    0xa45d9058c20e1e04, 0x8152c0cad38ac466, 0x8496296d4dfa977f, 0xb08b098629d7ba80,
    0x9bbf1f5a7a5e5250, 0x127c40533241dfcc, 0x3413ff3c4293f613, 0x337e6dc88607527c,
    0xd07c032cd86ccc54, 0x69b9a0ec27022f11, 0x22d6953e2f8b311c, 0xf7b3460537183cc6,
    0x2a75448592deb060, 0x900e458fd872465b, 0x0862fc0119f362bc, 0x4e4db2b01b62cc90,
    0x479bc8c7f8eeb7eb, 0x1de76bf582d6692e, 0x591aef21992f3c9d, 0x42a27df1122dc714,
    0xb88f6b13b979ec39, 0x4c68e05ee68feb9f, 0x040f650582dfcd97, 0x34d0f1b06b935d06,
    0xb1a2878252c0d9e3, 0x81ce7da74a23533f, 0x6311a8f6c1866e9e, 0xbdb583d2d6bc1c50,
    0xbe510a15d1dcfd4e, 0xfda1548bfe84419d, 0x2c635e0a97b862f4, 0x749e4c74d528fb73,
    0x05e62839d516a825, 0x76782745b50d4032, 0x5d5b7f8c8ae6137e, 0x474fa35de56d355f,
    0x849cd3e160180375, 0x547d882a26d8c22c, 0xeaaae66b49c4a191, 0x1cdcaf82b8ea57c4,
    0x559e98f962246597, 0xd47d98fc5ac8ef1c, 0x5a1d54f45289579c, 0xa25df6d6914b889a,
    0x6b2ba3ec22005114, 0xf9beb7cd096fae08, 0x9c52cbcab5ccde90, 0x4fb3aeadb627a25f,
    0x29f0a29d345ca93a, 0x10a04b7d606b7ea1, 0x6691eed8b4e5a4a7, 0x91fbf7b23074ac79,
    0x743597649be6997a, 0x41f14a82edaf7226, 0x1c5043d4925b040a, 0x82ffdc6ee8ee27f1,
    0x3869615861542877, 0x596666e052f6d172, 0xc45ed78c16cffd2d, 0xbe32d857250d3eae,
    0x42ced9b6f6212391, 0x85e449e1f672070c, 0x829d00db75d908f7, 0x5ddcdc08f3f23504,
    0x660e57a466df0325, 0x88674197f2af33cd, 0x82f07328fbc1b712, 0xf02edaea4003cff2,
    0xce582cf733cfa1ac, 0x733f7382485160bc, 0xe6c01e5475154a29, 0x1ae47ac8e68eaff8,
    0xee455b2b890df214, 0xeba4fba7d354dd45, 0xb4f8e34178836975, 0x3ac794a00da63ac9,
    0x12b6f1e8e2fda21f, 0x9e5ded63709d151e, 0x1f81281d10656174, 0x68693e2a57af619a,
    0xde32dfbef20b86c8, 0x9382a144f328eef0, 0x5782be00fc77cab5, 0xa23336724f55c0a8,
    0xcfcad9cf927cc008, 0x7ba0a4fd8900b951, 0x80e8c08089641640, 0x0610b0f0a556d976,
    0xfb3cb5c836668918, 0xc606065c9fcd3faa, 0x0a5c324d71ae7fd4, 0x5b9ea9d996229b6d,
    0x39b36d55aa2abe05, 0xe591fc5096a5dc34, 0x829bf2545c4cc877, 0x3b1e8d0a4c9bf50d,
    0x4457c68f683409c3, 0xb2b68d828d35d751, 0x01cc8ad6440209b4, 0x3b6739dc3569856b,
    0x47049445d5e5062a, 0x94223a6fa5ddd806, 0x8961a8f86d46ab30, 0x3f18dfde1d8a4631,
];
