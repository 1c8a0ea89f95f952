//! Vorbis floor (type 1): 频谱包络的控制点解码与曲线光栅化.
//!
//! floor1 将包络描述为一组 (x, y) 控制点: setup 阶段确定 x 坐标
//! 与遍历顺序, 每帧解码 y 幅值 (前两个直接读取, 其余相对两侧
//! 已解码邻点的预测值编码), 再以整数 Bresenham 直线在对数幅度
//! 域内光栅化, 最终查 256 项 dB→线性表逐点乘入频谱.

use yue_core::{YueError, YueResult};

use super::bitreader::{LsbBitReader, ilog};
use super::codebook::Codebook;

/// floor1 分区数上限 (5 位字段, 含冗余上界)
pub(crate) const FLOOR_MAX_PARTITIONS: usize = 32;
/// floor1 class 数上限 (4 位字段 + 1)
pub(crate) const FLOOR_MAX_CLASSES: usize = 16;
/// 控制点数上限: 每分区至多 8 维, 外加两个隐式端点
pub(crate) const FLOOR_MAX_VALUES: usize = FLOOR_MAX_PARTITIONS * 8 + 2;

/// multiplier → y 幅值范围
const RANGES: [i32; 4] = [256, 128, 84, 64];

#[derive(Debug, Clone)]
pub(crate) struct Floor {
    partitions: usize,
    multiplier: i32,
    range: i32,
    /// 控制点总数 (含两个隐式端点)
    values: usize,
    partition_classes: Vec<u8>,
    class_dimensions: Vec<u8>,
    class_subclasses: Vec<u8>,
    class_masterbooks: Vec<u8>,
    /// 每 class 的子码表 (-1 表示该子类无码表, y 取 0)
    subclass_books: Vec<[i16; 8]>,
    x_list: Vec<i32>,
    /// x 升序遍历用的下标排列
    list_order: Vec<usize>,
}

impl Floor {
    /// 从 setup 位流解析一个 floor1 配置.
    pub(crate) fn decode_setup(
        br: &mut LsbBitReader<'_>,
        codebook_count: usize,
    ) -> YueResult<Self> {
        let partitions = br.read_bits(5)? as usize;
        if partitions > FLOOR_MAX_PARTITIONS {
            return Err(YueError::InvalidData(format!(
                "Vorbis floor1 partitions 越界: {partitions}",
            )));
        }

        let mut partition_classes = Vec::with_capacity(partitions);
        let mut max_class = -1i32;
        for _ in 0..partitions {
            let class = br.read_bits(4)? as u8;
            max_class = max_class.max(i32::from(class));
            partition_classes.push(class);
        }

        let class_count = (max_class + 1) as usize;
        debug_assert!(class_count <= FLOOR_MAX_CLASSES);
        let mut class_dimensions = vec![0u8; class_count];
        let mut class_subclasses = vec![0u8; class_count];
        let mut class_masterbooks = vec![0u8; class_count];
        let mut subclass_books = vec![[-1i16; 8]; class_count];

        for i in 0..class_count {
            class_dimensions[i] = (br.read_bits(3)? + 1) as u8;
            class_subclasses[i] = br.read_bits(2)? as u8;

            if class_subclasses[i] > 0 {
                let masterbook = br.read_bits(8)? as u8;
                if usize::from(masterbook) >= codebook_count {
                    return Err(YueError::InvalidData(
                        "Vorbis floor1 masterbook 索引越界".into(),
                    ));
                }
                class_masterbooks[i] = masterbook;
            }
            for j in 0..(1usize << class_subclasses[i]) {
                // 原始值 0 表示"无码表", 存储为 -1
                let book = br.read_bits(8)? as i16 - 1;
                if book >= 0 && book as usize >= codebook_count {
                    return Err(YueError::InvalidData(
                        "Vorbis floor1 subclass 码表索引越界".into(),
                    ));
                }
                subclass_books[i][j] = book;
            }
        }

        let multiplier = (br.read_bits(2)? + 1) as i32;
        let range = RANGES[(multiplier - 1) as usize];
        let range_bits = br.read_bits(4)? as u8;

        let mut x_list = Vec::with_capacity(FLOOR_MAX_VALUES);
        x_list.push(0);
        x_list.push(1i32 << range_bits);
        for &class in &partition_classes {
            let dims = class_dimensions[usize::from(class)];
            for _ in 0..dims {
                x_list.push(br.read_bits(range_bits)? as i32);
            }
        }
        let values = x_list.len();
        if values > FLOOR_MAX_VALUES {
            return Err(YueError::InvalidData(format!(
                "Vorbis floor1 控制点数越界: {values}",
            )));
        }

        // 曲线光栅化要求按 x 升序遍历控制点, 预先排好下标
        let mut list_order: Vec<usize> = (0..values).collect();
        list_order.sort_by_key(|&i| x_list[i]);

        Ok(Self {
            partitions,
            multiplier,
            range,
            values,
            partition_classes,
            class_dimensions,
            class_subclasses,
            class_masterbooks,
            subclass_books,
            x_list,
            list_order,
        })
    }

    /// 解码一帧的 y 幅值列表.
    ///
    /// 返回 `None` 表示该声道本帧无能量 (floor 缺席).
    pub(crate) fn decode_frame(
        &self,
        br: &mut LsbBitReader<'_>,
        codebooks: &[Codebook],
    ) -> YueResult<Option<Vec<i32>>> {
        if !br.read_flag()? {
            return Ok(None);
        }

        let range_bits = ilog((self.range - 1) as u32);
        let mut y_list = Vec::with_capacity(self.values);
        y_list.push(br.read_bits(range_bits)? as i32);
        y_list.push(br.read_bits(range_bits)? as i32);

        for i in 0..self.partitions {
            let class = usize::from(self.partition_classes[i]);
            let cdim = self.class_dimensions[class];
            let cbits = self.class_subclasses[class];
            let csub = (1u32 << cbits) - 1;

            let mut cval = 0u32;
            if cbits > 0 {
                let book = usize::from(self.class_masterbooks[class]);
                cval = codebooks[book].decode_scalar(br)?;
            }

            for _ in 0..cdim {
                let book = self.subclass_books[class][(cval & csub) as usize];
                cval >>= cbits;

                if book >= 0 {
                    y_list.push(codebooks[book as usize].decode_scalar(br)? as i32);
                } else {
                    y_list.push(0);
                }
            }
        }
        Ok(Some(y_list))
    }

    /// 将解码出的控制点合成为包络曲线, 逐点乘入频谱 `data[..n2]`.
    pub(crate) fn synthesis(&self, y_list: &[i32], data: &mut [f32], n2: usize) {
        let mut y_final = [0i32; FLOOR_MAX_VALUES];
        let mut step2 = [false; FLOOR_MAX_VALUES];

        // 幅值合成: 每个点相对两侧邻点的线性预测做奇偶展开修正
        step2[0] = true;
        step2[1] = true;
        y_final[0] = y_list[0];
        y_final[1] = y_list[1];

        for i in 2..self.values {
            let lo = low_neighbor(&self.x_list, i);
            let hi = high_neighbor(&self.x_list, i);
            let predicted = render_point(
                self.x_list[lo],
                y_final[lo],
                self.x_list[hi],
                y_final[hi],
                self.x_list[i],
            );

            let val = y_list[i];
            let highroom = self.range - predicted;
            let lowroom = predicted;
            let room = 2 * highroom.min(lowroom);

            if val != 0 {
                step2[lo] = true;
                step2[hi] = true;
                step2[i] = true;

                y_final[i] = if val >= room {
                    if highroom > lowroom {
                        val - lowroom + predicted
                    } else {
                        predicted - val + highroom - 1
                    }
                } else if val & 1 == 1 {
                    predicted - (val + 1) / 2
                } else {
                    predicted + val / 2
                };
            } else {
                step2[i] = false;
                y_final[i] = predicted;
            }
        }

        for y in y_final.iter_mut().take(self.values) {
            *y = (*y).clamp(0, self.range - 1);
        }

        // 曲线合成: 按 x 升序连接被标记的控制点
        let mut lx = 0i32;
        let mut ly = y_final[self.list_order[0]] * self.multiplier;
        let mut hx = 0i32;
        let mut hy = ly;

        for &i in self.list_order.iter().take(self.values).skip(1) {
            if !step2[i] {
                continue;
            }
            hx = self.x_list[i];
            hy = y_final[i] * self.multiplier;
            if lx < hx {
                render_line(lx, ly, hx.min(n2 as i32), hy, data);
            }
            lx = hx;
            ly = hy;
        }

        // 最后一个控制点之后用平直包络填满剩余频谱
        if (hx as usize) < n2 {
            let value = FLOOR1_INVERSE_DB_TABLE[db_index(hy)];
            for sample in data[hx as usize..n2].iter_mut() {
                *sample *= value;
            }
        }
    }
}

/// x 小于 v[x] 的已解码点中最接近者
fn low_neighbor(v: &[i32], x: usize) -> usize {
    let mut n = 0;
    let mut max = i32::MIN;
    for (i, &xi) in v.iter().enumerate().take(x) {
        if xi < v[x] && xi > max {
            n = i;
            max = xi;
        }
    }
    n
}

/// x 大于 v[x] 的已解码点中最接近者
fn high_neighbor(v: &[i32], x: usize) -> usize {
    let mut n = 0;
    let mut min = i32::MAX;
    for (i, &xi) in v.iter().enumerate().take(x) {
        if xi > v[x] && xi < min {
            n = i;
            min = xi;
        }
    }
    n
}

/// 求直线 (x0,y0)-(x1,y1) 在横坐标 x 处的整数纵坐标
fn render_point(x0: i32, y0: i32, x1: i32, y1: i32, x: i32) -> i32 {
    if x1 == x0 {
        return y0;
    }
    let dy = y1 - y0;
    let adx = x1 - x0;
    let ady = dy.abs();
    let err = ady * (x - x0);
    let off = err / adx;
    if dy < 0 { y0 - off } else { y0 + off }
}

/// 沿整数直线将 dB 表值乘入 data[x0..x1]
fn render_line(x0: i32, y0: i32, x1: i32, y1: i32, data: &mut [f32]) {
    if x1 <= x0 {
        return;
    }
    let dy = y1 - y0;
    let adx = x1 - x0;
    let mut ady = dy.abs();
    let base = dy / adx;
    let sy = if dy < 0 { base - 1 } else { base + 1 };
    ady -= base.abs() * adx;

    let mut y = y0;
    let mut err = 0i32;
    data[x0 as usize] *= FLOOR1_INVERSE_DB_TABLE[db_index(y)];

    for x in (x0 + 1)..x1 {
        err += ady;
        if err >= adx {
            err -= adx;
            y += sy;
        } else {
            y += base;
        }
        data[x as usize] *= FLOOR1_INVERSE_DB_TABLE[db_index(y)];
    }
}

fn db_index(y: i32) -> usize {
    y.clamp(0, 255) as usize
}

/// floor1 的 dB→线性增益固定表 (规范附录)
#[allow(clippy::excessive_precision)]
pub(crate) static FLOOR1_INVERSE_DB_TABLE: [f32; 256] = [
    1.0649863e-07, 1.1341951e-07, 1.2079015e-07, 1.2863978e-07,
    1.3699951e-07, 1.4590251e-07, 1.5538408e-07, 1.6548181e-07,
    1.7623575e-07, 1.8768855e-07, 1.9988561e-07, 2.1287530e-07,
    2.2670913e-07, 2.4144197e-07, 2.5713223e-07, 2.7384213e-07,
    2.9163793e-07, 3.1059021e-07, 3.3077411e-07, 3.5226968e-07,
    3.7516214e-07, 3.9954229e-07, 4.2550680e-07, 4.5315863e-07,
    4.8260743e-07, 5.1396998e-07, 5.4737065e-07, 5.8294187e-07,
    6.2082472e-07, 6.6116941e-07, 7.0413592e-07, 7.4989464e-07,
    7.9862701e-07, 8.5052630e-07, 9.0579828e-07, 9.6466216e-07,
    1.0273513e-06, 1.0941144e-06, 1.1652161e-06, 1.2409384e-06,
    1.3215816e-06, 1.4074654e-06, 1.4989305e-06, 1.5963394e-06,
    1.7000785e-06, 1.8105592e-06, 1.9282195e-06, 2.0535261e-06,
    2.1869758e-06, 2.3290978e-06, 2.4804557e-06, 2.6416497e-06,
    2.8133190e-06, 2.9961443e-06, 3.1908506e-06, 3.3982101e-06,
    3.6190449e-06, 3.8542308e-06, 4.1047004e-06, 4.3714470e-06,
    4.6555282e-06, 4.9580707e-06, 5.2802740e-06, 5.6234160e-06,
    5.9888572e-06, 6.3780469e-06, 6.7925283e-06, 7.2339451e-06,
    7.7040476e-06, 8.2047000e-06, 8.7378876e-06, 9.3057248e-06,
    9.9104632e-06, 1.0554501e-05, 1.1240392e-05, 1.1970856e-05,
    1.2748789e-05, 1.3577278e-05, 1.4459606e-05, 1.5399272e-05,
    1.6400004e-05, 1.7465768e-05, 1.8600792e-05, 1.9809576e-05,
    2.1096914e-05, 2.2467911e-05, 2.3928002e-05, 2.5482978e-05,
    2.7139006e-05, 2.8902651e-05, 3.0780908e-05, 3.2781225e-05,
    3.4911534e-05, 3.7180282e-05, 3.9596466e-05, 4.2169667e-05,
    4.4910090e-05, 4.7828601e-05, 5.0936773e-05, 5.4246931e-05,
    5.7772202e-05, 6.1526565e-05, 6.5524908e-05, 6.9783085e-05,
    7.4317983e-05, 7.9147585e-05, 8.4291040e-05, 8.9768747e-05,
    9.5602426e-05, 1.0181521e-04, 1.0843174e-04, 1.1547824e-04,
    1.2298267e-04, 1.3097477e-04, 1.3948625e-04, 1.4855085e-04,
    1.5820453e-04, 1.6848555e-04, 1.7943469e-04, 1.9109536e-04,
    2.0351382e-04, 2.1673929e-04, 2.3082423e-04, 2.4582449e-04,
    2.6179955e-04, 2.7881275e-04, 2.9693158e-04, 3.1622787e-04,
    3.3677814e-04, 3.5866388e-04, 3.8197188e-04, 4.0679456e-04,
    4.3323036e-04, 4.6138411e-04, 4.9136745e-04, 5.2329927e-04,
    5.5730621e-04, 5.9352311e-04, 6.3209358e-04, 6.7317058e-04,
    7.1691700e-04, 7.6350630e-04, 8.1312324e-04, 8.6596457e-04,
    9.2223983e-04, 9.8217216e-04, 1.0459992e-03, 1.1139742e-03,
    1.1863665e-03, 1.2634633e-03, 1.3455702e-03, 1.4330129e-03,
    1.5261382e-03, 1.6253153e-03, 1.7309374e-03, 1.8434235e-03,
    1.9632195e-03, 2.0908006e-03, 2.2266726e-03, 2.3713743e-03,
    2.5254795e-03, 2.6895994e-03, 2.8643847e-03, 3.0505286e-03,
    3.2487691e-03, 3.4598925e-03, 3.6847358e-03, 3.9241906e-03,
    4.1792066e-03, 4.4507950e-03, 4.7400328e-03, 5.0480668e-03,
    5.3761186e-03, 5.7254891e-03, 6.0975636e-03, 6.4938176e-03,
    6.9158225e-03, 7.3652516e-03, 7.8438871e-03, 8.3536271e-03,
    8.8964928e-03, 9.4746370e-03, 1.0090352e-02, 1.0746080e-02,
    1.1444421e-02, 1.2188144e-02, 1.2980198e-02, 1.3823725e-02,
    1.4722068e-02, 1.5678791e-02, 1.6697687e-02, 1.7782797e-02,
    1.8938423e-02, 2.0169149e-02, 2.1479854e-02, 2.2875735e-02,
    2.4362330e-02, 2.5945531e-02, 2.7631618e-02, 2.9427276e-02,
    3.1339626e-02, 3.3376252e-02, 3.5545228e-02, 3.7855157e-02,
    4.0315199e-02, 4.2935108e-02, 4.5725273e-02, 4.8696758e-02,
    5.1861348e-02, 5.5231591e-02, 5.8820850e-02, 6.2643361e-02,
    6.6714279e-02, 7.1049749e-02, 7.5666962e-02, 8.0584227e-02,
    8.5821044e-02, 9.1398179e-02, 9.7337747e-02, 1.0366330e-01,
    1.1039993e-01, 1.1757434e-01, 1.2521498e-01, 1.3335215e-01,
    1.4201813e-01, 1.5124727e-01, 1.6107617e-01, 1.7154380e-01,
    1.8269168e-01, 1.9456402e-01, 2.0720788e-01, 2.2067342e-01,
    2.3501402e-01, 2.5028656e-01, 2.6655159e-01, 2.8387361e-01,
    3.0232132e-01, 3.2196786e-01, 3.4289114e-01, 3.6517414e-01,
    3.8890521e-01, 4.1417847e-01, 4.4109412e-01, 4.6975890e-01,
    5.0028648e-01, 5.3279791e-01, 5.6742212e-01, 6.0429640e-01,
    6.4356699e-01, 6.8538959e-01, 7.2993007e-01, 7.7736504e-01,
    8.2788260e-01, 8.8168307e-01, 9.3897980e-01, 1.0,
];
